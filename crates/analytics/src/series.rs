use chrono::NaiveDate;
use core_types::PriceSeries;
use serde::Serialize;

/// Percentage change between adjacent positions: `v[i] / v[i-1] - 1`.
///
/// Position 0 is always undefined, as is any position whose own value or
/// predecessor is undefined, or whose predecessor is zero. This is the only
/// place returns are derived; every metric goes through it.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(values.len());
    for (i, current) in values.iter().enumerate() {
        let change = match (i.checked_sub(1).and_then(|p| values[p]), current) {
            (Some(previous), Some(current)) if previous != 0.0 => Some(current / previous - 1.0),
            _ => None,
        };
        changes.push(change.filter(|c| c.is_finite()));
    }
    changes
}

/// Simple daily returns of a price series, index-aligned with the prices.
pub fn returns(prices: &[f64]) -> Vec<Option<f64>> {
    let prices: Vec<Option<f64>> = prices
        .iter()
        .map(|p| Some(*p).filter(|p| p.is_finite()))
        .collect();
    pct_change(&prices)
}

/// Cumulative compounded return at every position: `∏(1 + r_k) - 1`.
pub fn cumulative_returns(prices: &[f64]) -> Vec<Option<f64>> {
    compound(&returns(prices))
}

/// Compounds a return series left to right.
///
/// Position 0 is the starting point and may be undefined (a return series
/// always is there). Any later undefined return breaks the chain: that position
/// and all later ones are undefined rather than silently bridging the gap.
pub fn compound(returns: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut growth = 1.0;
    let mut broken = false;

    returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if broken {
                return None;
            }
            match r {
                Some(r) => {
                    growth *= 1.0 + r;
                    Some(growth - 1.0)
                }
                None => {
                    broken = i > 0;
                    None
                }
            }
        })
        .collect()
}

/// A date-indexed sequence of optional values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Closing prices of a series. Non-finite closes become undefined.
    pub fn from_prices(prices: &PriceSeries) -> Self {
        Self {
            dates: prices.dates(),
            values: prices
                .closes()
                .into_iter()
                .map(|c| Some(c).filter(|c| c.is_finite()))
                .collect(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at the most recent date, if defined.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Percentage change of this series on the same dates.
    pub fn pct_change(&self) -> Self {
        self.with_values(pct_change(&self.values))
    }

    /// Replaces the values while keeping the dates. Lengths must match.
    pub fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.dates.len());
        Self {
            dates: self.dates.clone(),
            values,
        }
    }

    /// Looks up the value at each of `dates`; dates this series lacks are undefined.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Vec<Option<f64>> {
        dates
            .iter()
            .map(|date| {
                self.dates
                    .binary_search(date)
                    .ok()
                    .and_then(|i| self.values[i])
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}
