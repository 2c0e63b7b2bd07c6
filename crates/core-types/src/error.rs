use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Price series for {ticker} is not strictly increasing at {date}")]
    UnorderedSeries { ticker: String, date: NaiveDate },

    #[error("Unknown analysis period '{0}' (expected one of 1m, 3m, 6m, YTD, 1a, 3a, 5a, MAX)")]
    UnknownPeriod(String),
}
