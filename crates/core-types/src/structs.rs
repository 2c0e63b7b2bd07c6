use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Descriptive information about a tracked instrument. Used only for labeling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    /// Category tag, e.g. "Clean Energy". May be empty.
    #[serde(default)]
    pub theme: String,
}

impl InstrumentMetadata {
    pub fn new(
        ticker: impl Into<String>,
        name: impl Into<String>,
        theme: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let ticker = ticker.into();
        if ticker.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "ticker".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(Self {
            ticker,
            name: name.into(),
            theme: theme.into(),
        })
    }

    /// The "TICKER - Name" label used in tables and legends.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.ticker.clone()
        } else {
            format!("{} - {}", self.ticker, self.name)
        }
    }
}

/// One daily row of price history. Only `close` is required by the analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<i64>,
    pub dividends: Option<f64>,
    pub stock_splits: Option<f64>,
    pub capital_gains: Option<f64>,
}

impl PricePoint {
    /// A row carrying only a closing price.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
            dividends: None,
            stock_splits: None,
            capital_gains: None,
        }
    }
}

/// The ordered price history of a single instrument.
///
/// Dates are strictly increasing; this is checked at construction and the
/// series is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, CoreError> {
        let ticker = ticker.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(CoreError::UnorderedSeries {
                    ticker,
                    date: pair[1].date,
                });
            }
        }
        Ok(Self { ticker, points })
    }

    /// Builds a series from `(date, close)` pairs.
    pub fn from_closes(
        ticker: impl Into<String>,
        closes: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, CoreError> {
        let points = closes
            .into_iter()
            .map(|(date, close)| PricePoint::close_only(date, close))
            .collect();
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Flattens the series into long-format observations.
    pub fn observations(&self) -> impl Iterator<Item = PriceObservation> + '_ {
        self.points.iter().map(|p| PriceObservation {
            date: p.date,
            ticker: self.ticker.clone(),
            close: p.close,
        })
    }
}

/// A single (date, instrument, price) cell of a long-format price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn rejects_duplicate_and_unordered_dates() {
        let err = PriceSeries::from_closes("SPY", [(date(2), 1.0), (date(2), 2.0)]).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnorderedSeries {
                ticker: "SPY".to_string(),
                date: date(2)
            }
        );
        assert!(PriceSeries::from_closes("SPY", [(date(3), 1.0), (date(2), 2.0)]).is_err());
    }

    #[test]
    fn metadata_requires_a_ticker() {
        assert!(InstrumentMetadata::new("  ", "Empty", "").is_err());
        let meta = InstrumentMetadata::new("ICLN", "iShares Global Clean Energy", "Energy").unwrap();
        assert_eq!(meta.label(), "ICLN - iShares Global Clean Energy");
    }
}
