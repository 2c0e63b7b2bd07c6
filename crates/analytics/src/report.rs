use crate::cross::{CorrelationMatrix, PriceTable};
use chrono::NaiveDate;
use core_types::InstrumentMetadata;
use serde::Serialize;

/// Headline metrics of a single instrument over the selected date range.
///
/// Every ratio is `Option<>`: `None` means there was not enough history for
/// the rolling window, or the metric had a zero denominator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSummary {
    pub metadata: InstrumentMetadata,
    pub observations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,

    // I. Return
    pub total_return: Option<f64>,
    /// Mean daily return × 252.
    pub annualized_return: Option<f64>,

    // II. Risk (last value of the rolling series)
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
}

/// Sensitivity and divergence of an instrument against a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub ticker: String,
    pub benchmark: String,
    pub beta: Option<f64>,
    pub tracking_error: Option<f64>,
    /// Dates where both instruments have a defined return.
    pub overlapping_returns: usize,
}

/// Full-period annualized return against annualized volatility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReturnPoint {
    pub ticker: String,
    pub label: String,
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
}

/// Metrics rescaled to `[0, 1]` across the compared instruments, 1 being best.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarScores {
    pub ticker: String,
    pub label: String,
    pub annualized_return: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
}

/// Everything needed to display a side-by-side comparison of instruments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub summaries: Vec<InstrumentSummary>,
    pub normalized: PriceTable,
    pub correlation: CorrelationMatrix,
    pub risk_return: Vec<RiskReturnPoint>,
    pub radar: Vec<RadarScores>,
}
