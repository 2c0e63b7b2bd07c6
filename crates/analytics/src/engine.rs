use crate::cross::{correlation_matrix_of, normalize};
use crate::metrics::{beta_by_date, max_drawdown, sharpe, sortino, tracking_error_by_date, volatility};
use crate::ranking::{MetricDirection, score};
use crate::report::{
    BenchmarkReport, ComparisonReport, InstrumentSummary, RadarScores, RiskReturnPoint,
};
use crate::rolling::{mean, std_dev};
use crate::series::{TimeSeries, cumulative_returns, returns};
use crate::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use core_types::{InstrumentMetadata, PriceSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// The caller-supplied knobs of every rolling metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricParams {
    /// Rolling window, in trading days.
    pub window: usize,
    /// Annual risk-free rate, e.g. 0.02 for 2%.
    pub risk_free_rate: f64,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            window: TRADING_DAYS_PER_YEAR,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

/// A stateless calculator that turns price histories into reports.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {
    params: MetricParams,
}

impl AnalyticsEngine {
    pub fn new(params: MetricParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> MetricParams {
        self.params
    }

    /// Computes the headline metrics of one instrument.
    ///
    /// Rolling metrics report their value on the last date of the series, which
    /// is `None` when the series is shorter than the window.
    pub fn summarize(&self, metadata: &InstrumentMetadata, series: &PriceSeries) -> InstrumentSummary {
        let MetricParams { window, risk_free_rate } = self.params;
        let closes = series.closes();
        let daily = returns(&closes);

        let summary = InstrumentSummary {
            metadata: metadata.clone(),
            observations: series.len(),
            first_date: series.first_date(),
            last_date: series.last_date(),
            total_return: last(cumulative_returns(&closes)),
            annualized_return: annualized_mean(&daily),
            annualized_volatility: last(volatility(&daily, window)),
            sharpe_ratio: last(sharpe(&daily, risk_free_rate, window)),
            sortino_ratio: last(sortino(&daily, risk_free_rate, window)),
            max_drawdown: max_drawdown(&closes),
        };

        debug!(
            ticker = %metadata.ticker,
            observations = summary.observations,
            window,
            "Summarized instrument."
        );
        summary
    }

    /// Rolling beta and tracking error of `series` against `benchmark`, as of the last date.
    pub fn relative_to(&self, series: &PriceSeries, benchmark: &PriceSeries) -> BenchmarkReport {
        let window = self.params.window;
        let instrument_returns = TimeSeries::from_prices(series).pct_change();
        let benchmark_returns = TimeSeries::from_prices(benchmark).pct_change();

        let aligned = benchmark_returns.reindex(instrument_returns.dates());
        let overlapping_returns = instrument_returns
            .values()
            .iter()
            .zip(&aligned)
            .filter(|(r, b)| r.is_some() && b.is_some())
            .count();

        BenchmarkReport {
            ticker: series.ticker().to_string(),
            benchmark: benchmark.ticker().to_string(),
            beta: beta_by_date(&instrument_returns, &benchmark_returns, window).last(),
            tracking_error: tracking_error_by_date(&instrument_returns, &benchmark_returns, window)
                .last(),
            overlapping_returns,
        }
    }

    /// Full-period annualized return and volatility, for a risk/return scatter.
    pub fn risk_return(&self, metadata: &InstrumentMetadata, series: &PriceSeries) -> RiskReturnPoint {
        let daily: Vec<f64> = returns(&series.closes()).into_iter().flatten().collect();
        RiskReturnPoint {
            ticker: metadata.ticker.clone(),
            label: metadata.label(),
            annualized_return: mean(&daily).map(|m| m * TRADING_DAYS_PER_YEAR as f64),
            annualized_volatility: std_dev(&daily)
                .map(|s| s * (TRADING_DAYS_PER_YEAR as f64).sqrt()),
        }
    }

    /// Builds the side-by-side comparison of several instruments.
    ///
    /// Each instrument is summarized independently; only the base-100 table,
    /// the correlation matrix and the radar scores look across instruments.
    pub fn compare(&self, instruments: &[(InstrumentMetadata, PriceSeries)]) -> ComparisonReport {
        let summaries: Vec<InstrumentSummary> = instruments
            .iter()
            .map(|(metadata, series)| self.summarize(metadata, series))
            .collect();

        let risk_return = instruments
            .iter()
            .map(|(metadata, series)| self.risk_return(metadata, series))
            .collect();

        let tickers: Vec<String> = instruments.iter().map(|(m, _)| m.ticker.clone()).collect();
        let by_ticker: HashMap<String, PriceSeries> = instruments
            .iter()
            .map(|(m, s)| (m.ticker.clone(), s.clone()))
            .collect();
        let normalized = normalize(&by_ticker, &tickers);

        let all_series: Vec<PriceSeries> = instruments.iter().map(|(_, s)| s.clone()).collect();
        let correlation = correlation_matrix_of(&all_series);

        let radar = radar_scores(&summaries);

        debug!(instruments = instruments.len(), "Built comparison report.");
        ComparisonReport {
            summaries,
            normalized,
            correlation,
            risk_return,
            radar,
        }
    }
}

fn radar_scores(summaries: &[InstrumentSummary]) -> Vec<RadarScores> {
    let column = |f: fn(&InstrumentSummary) -> Option<f64>| -> Vec<Option<f64>> {
        summaries.iter().map(f).collect()
    };

    let returns = score(&column(|s| s.annualized_return), MetricDirection::HigherIsBetter);
    let volatility = score(&column(|s| s.annualized_volatility), MetricDirection::LowerIsBetter);
    let sharpe = score(&column(|s| s.sharpe_ratio), MetricDirection::HigherIsBetter);
    let sortino = score(&column(|s| s.sortino_ratio), MetricDirection::HigherIsBetter);
    let drawdown = score(
        &column(|s| s.max_drawdown.map(f64::abs)),
        MetricDirection::LowerIsBetter,
    );

    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| RadarScores {
            ticker: s.metadata.ticker.clone(),
            label: s.metadata.label(),
            annualized_return: returns[i],
            volatility: volatility[i],
            sharpe_ratio: sharpe[i],
            sortino_ratio: sortino[i],
            max_drawdown: drawdown[i],
        })
        .collect()
}

fn last(values: Vec<Option<f64>>) -> Option<f64> {
    values.last().copied().flatten()
}

fn annualized_mean(returns: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = returns.iter().flatten().copied().collect();
    mean(&defined).map(|m| m * TRADING_DAYS_PER_YEAR as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn metadata(ticker: &str) -> InstrumentMetadata {
        InstrumentMetadata::new(ticker, format!("{ticker} ETF"), "Test").unwrap()
    }

    /// A deterministic zig-zag around a drift so every rolling metric is defined.
    fn series(ticker: &str, days: usize, drift: f64, swing: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut price = 100.0;
        let points = (0..days).map(|i| {
            if i > 0 {
                let shock = if i % 3 == 0 { -swing } else { swing * 0.6 };
                price *= 1.0 + drift + shock;
            }
            (start + Duration::days(i as i64), price)
        });
        PriceSeries::from_closes(ticker, points.collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn short_history_reports_insufficient_data() {
        let engine = AnalyticsEngine::default();
        let prices = PriceSeries::from_closes(
            "SPY",
            [100.0, 110.0, 121.0]
                .iter()
                .enumerate()
                .map(|(i, p)| (NaiveDate::from_ymd_opt(2024, 1, 2 + i as u32).unwrap(), *p)),
        )
        .unwrap();

        let summary = engine.summarize(&metadata("SPY"), &prices);
        assert_eq!(summary.observations, 3);
        assert_abs_diff_eq!(summary.total_return.unwrap(), 0.21, epsilon = 1e-12);
        assert_abs_diff_eq!(summary.annualized_return.unwrap(), 0.10 * 252.0, epsilon = 1e-9);
        assert_eq!(summary.max_drawdown, Some(0.0));
        assert_eq!(summary.annualized_volatility, None);
        assert_eq!(summary.sharpe_ratio, None);
        assert_eq!(summary.sortino_ratio, None);
    }

    #[test]
    fn empty_series_is_a_degenerate_summary() {
        let engine = AnalyticsEngine::default();
        let empty = PriceSeries::new("SPY", vec![]).unwrap();
        let summary = engine.summarize(&metadata("SPY"), &empty);
        assert_eq!(summary.observations, 0);
        assert_eq!(summary.total_return, None);
        assert_eq!(summary.annualized_return, None);
        assert_eq!(summary.max_drawdown, None);
    }

    #[test]
    fn long_history_defines_every_rolling_metric() {
        let engine = AnalyticsEngine::new(MetricParams { window: 20, risk_free_rate: 0.02 });
        let summary = engine.summarize(&metadata("QQQ"), &series("QQQ", 60, 0.001, 0.01));
        assert!(summary.annualized_volatility.unwrap() > 0.0);
        assert!(summary.sharpe_ratio.is_some());
        assert!(summary.sortino_ratio.is_some());
        assert!(summary.max_drawdown.unwrap() < 0.0);
    }

    #[test]
    fn instrument_against_itself_has_unit_beta() {
        let engine = AnalyticsEngine::new(MetricParams { window: 10, risk_free_rate: 0.0 });
        let spy = series("SPY", 30, 0.0005, 0.01);
        let report = engine.relative_to(&spy, &spy);
        assert_abs_diff_eq!(report.beta.unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(report.tracking_error, Some(0.0));
        assert_eq!(report.overlapping_returns, 29);
    }

    #[test]
    fn comparison_scores_the_calmer_instrument_higher_on_risk() {
        let engine = AnalyticsEngine::new(MetricParams { window: 20, risk_free_rate: 0.02 });
        let instruments = vec![
            (metadata("CALM"), series("CALM", 60, 0.001, 0.005)),
            (metadata("WILD"), series("WILD", 60, 0.001, 0.03)),
        ];
        let report = engine.compare(&instruments);

        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.normalized.columns.len(), 2);
        assert_eq!(report.normalized.column("CALM").unwrap()[0], Some(100.0));
        assert_eq!(report.correlation.tickers, vec!["CALM".to_string(), "WILD".to_string()]);

        let calm = &report.radar[0];
        let wild = &report.radar[1];
        assert_eq!(calm.volatility, Some(1.0));
        assert_eq!(wild.volatility, Some(0.0));
        assert_eq!(calm.max_drawdown, Some(1.0));
        assert_eq!(wild.max_drawdown, Some(0.0));

        let calm_point = &report.risk_return[0];
        let wild_point = &report.risk_return[1];
        assert!(calm_point.annualized_volatility.unwrap() < wild_point.annualized_volatility.unwrap());
    }
}
