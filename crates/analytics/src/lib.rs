//! # etfscope Analytics Engine
//!
//! This crate computes the risk and return metrics shown for tracked ETFs.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of the database,
//!   the market-data provider or the CLI. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every metric is a free function over immutable slices
//!   that returns a new series or scalar. `AnalyticsEngine` only bundles the window and
//!   risk-free rate so callers can build reports per instrument.
//! - **Explicit Gaps:** An undefined value (insufficient history, zero denominator,
//!   missing data) is `None`. Defined values are always finite.
//!
//! ## Public API
//!
//! - `series`: `TimeSeries`, `pct_change`, `returns`, `cumulative_returns`.
//! - `metrics`: rolling volatility, Sharpe, Sortino, beta, tracking error and drawdown.
//! - `cross`: base-100 normalization and the correlation matrix.
//! - `ranking`: min-max rescaling for composite comparisons.
//! - `AnalyticsEngine` and the report structs built from the metrics.

// Declare the modules that constitute this crate.
pub mod cross;
pub mod engine;
pub mod metrics;
pub mod ranking;
pub mod report;
pub mod rolling;
pub mod series;

/// Trading days per year; the default rolling window and the annualization factor.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

// Re-export the key components to create a clean, public-facing API.
pub use cross::{CorrelationMatrix, PriceColumn, PriceTable, correlation_matrix, normalize};
pub use engine::{AnalyticsEngine, MetricParams};
pub use metrics::{
    beta, beta_by_date, drawdowns, max_drawdown, sharpe, sortino, tracking_error,
    tracking_error_by_date, volatility,
};
pub use ranking::{MetricDirection, normalize_minmax, normalize_minmax_defined, score};
pub use report::{BenchmarkReport, ComparisonReport, InstrumentSummary, RadarScores, RiskReturnPoint};
pub use series::{TimeSeries, cumulative_returns, pct_change, returns};
