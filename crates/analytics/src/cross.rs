use crate::rolling::{EPSILON, covariance, std_dev};
use crate::series::pct_change;
use chrono::NaiveDate;
use core_types::{PriceObservation, PriceSeries};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// One instrument's column of a wide, date-indexed table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceColumn {
    pub ticker: String,
    pub values: Vec<Option<f64>>,
}

/// A wide table: one row per date, one column per instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<PriceColumn>,
}

impl PriceTable {
    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.ticker == ticker)
            .map(|c| c.values.as_slice())
    }
}

/// Rebases each instrument to 100 for a relative-performance comparison.
///
/// Rows are restricted to the dates every selected instrument has a price for.
/// Each column is divided by its own first price in that range, so the values
/// compare performance only, not price levels. Requested instruments missing
/// from `prices_by_instrument` are skipped.
pub fn normalize(
    prices_by_instrument: &HashMap<String, PriceSeries>,
    instruments: &[String],
) -> PriceTable {
    let mut seen = HashSet::new();
    let selected: Vec<&PriceSeries> = instruments
        .iter()
        .filter(|ticker| seen.insert(ticker.as_str()))
        .filter_map(|ticker| {
            let series = prices_by_instrument.get(ticker);
            if series.is_none() {
                warn!(ticker = %ticker, "No prices available, skipping instrument in normalization.");
            }
            series
        })
        .collect();

    let Some((first, rest)) = selected.split_first() else {
        return PriceTable::default();
    };

    let mut common: BTreeSet<NaiveDate> = first.dates().into_iter().collect();
    for series in rest {
        let dates: HashSet<NaiveDate> = series.dates().into_iter().collect();
        common.retain(|d| dates.contains(d));
    }
    let dates: Vec<NaiveDate> = common.into_iter().collect();

    let columns = selected
        .iter()
        .map(|series| {
            let closes: Vec<f64> = dates
                .iter()
                .filter_map(|date| {
                    let points = series.points();
                    points
                        .binary_search_by_key(date, |p| p.date)
                        .ok()
                        .map(|i| points[i].close)
                })
                .collect();
            let values = match closes.first() {
                Some(&base) if base != 0.0 && base.is_finite() => closes
                    .iter()
                    .map(|c| Some(c / base * 100.0).filter(|v| v.is_finite()))
                    .collect(),
                _ => vec![None; closes.len()],
            };
            PriceColumn {
                ticker: series.ticker().to_string(),
                values,
            }
        })
        .collect();

    debug!(rows = dates.len(), "Normalized prices to base 100.");
    PriceTable { dates, columns }
}

/// A symmetric matrix of pairwise return correlations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        self.values[i][j]
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Pivots a long price table into one column per instrument.
///
/// Dates and tickers are sorted; several prices for the same cell are averaged
/// and absent cells are undefined.
pub fn pivot(price_table: &[PriceObservation]) -> PriceTable {
    let dates: Vec<NaiveDate> = price_table
        .iter()
        .map(|o| o.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let tickers: Vec<&str> = price_table
        .iter()
        .map(|o| o.ticker.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells: HashMap<(NaiveDate, &str), (f64, usize)> = HashMap::new();
    for observation in price_table.iter().filter(|o| o.close.is_finite()) {
        let cell = cells
            .entry((observation.date, observation.ticker.as_str()))
            .or_insert((0.0, 0));
        cell.0 += observation.close;
        cell.1 += 1;
    }

    let columns = tickers
        .iter()
        .map(|&ticker| PriceColumn {
            ticker: ticker.to_string(),
            values: dates
                .iter()
                .map(|date| cells.get(&(*date, ticker)).map(|(sum, n)| sum / *n as f64))
                .collect(),
        })
        .collect();

    PriceTable { dates, columns }
}

/// Pearson correlation of instrument returns from a long-format price table.
///
/// Returns come from [`pct_change`] on the pivoted prices. Each pair is
/// correlated over the dates where both returns are defined; pairs with fewer
/// than two such dates, or with a flat return series, are undefined. The
/// diagonal is 1.0 unless a column has no defined return at all.
pub fn correlation_matrix(price_table: &[PriceObservation]) -> CorrelationMatrix {
    let wide = pivot(price_table);
    let returns: Vec<Vec<Option<f64>>> = wide
        .columns
        .iter()
        .map(|c| pct_change(&c.values))
        .collect();

    let n = returns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = returns[i].iter().any(Option::is_some).then_some(1.0);
        for j in (i + 1)..n {
            let corr = pearson(&returns[i], &returns[j]);
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    CorrelationMatrix {
        tickers: wide.columns.into_iter().map(|c| c.ticker).collect(),
        values,
    }
}

/// Convenience wrapper over [`correlation_matrix`] for whole series.
pub fn correlation_matrix_of(series: &[PriceSeries]) -> CorrelationMatrix {
    let observations: Vec<PriceObservation> =
        series.iter().flat_map(|s| s.observations()).collect();
    correlation_matrix(&observations)
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    let sx = std_dev(&xs)?;
    let sy = std_dev(&ys)?;
    if sx <= EPSILON || sy <= EPSILON {
        return None;
    }
    let r = covariance(&xs, &ys)? / (sx * sy);
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
