use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::InstrumentMetadata;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub date_range: DateRange,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// The ETFs to ingest and offer for analysis.
    pub etfs: Vec<InstrumentMetadata>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.date_range.start > self.date_range.end {
            return Err(ConfigError::ValidationError(format!(
                "date_range.start ({}) is after date_range.end ({})",
                self.date_range.start, self.date_range.end
            )));
        }
        self.analysis.validate()?;

        let mut seen = HashSet::new();
        for etf in &self.etfs {
            if etf.ticker.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "every [[etfs]] entry needs a non-empty ticker".to_string(),
                ));
            }
            if !seen.insert(etf.ticker.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "ticker {} is listed more than once",
                    etf.ticker
                )));
            }
        }
        Ok(())
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.etfs.iter().map(|e| e.ticker.as_str()).collect()
    }

    pub fn find_etf(&self, ticker: &str) -> Option<&InstrumentMetadata> {
        self.etfs.iter().find(|e| e.ticker.eq_ignore_ascii_case(ticker))
    }
}

/// Where the SQLite database lives.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// The history window requested from the market-data provider.
#[derive(Debug, Clone, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Parameters of the rolling metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Rolling window in trading days (252 = one trading year).
    #[serde(default = "default_window")]
    pub window: usize,
    /// Annual risk-free rate used by the Sharpe and Sortino ratios.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.window must be at least 1".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::ValidationError(
                "analysis.risk_free_rate must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(&self, overrides: &AnalysisOverrides) -> Result<Self, ConfigError> {
        let merged = Self {
            window: overrides.window.unwrap_or(self.window),
            risk_free_rate: overrides.risk_free_rate.unwrap_or(self.risk_free_rate),
        };
        merged.validate()?;
        Ok(merged)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

fn default_window() -> usize {
    252
}

fn default_risk_free_rate() -> f64 {
    0.02
}

/// Command-line overrides for [`AnalysisConfig`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct AnalysisOverrides {
    /// Rolling window in trading days (overrides analysis.window).
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub window: Option<usize>,
    /// Annual risk-free rate, e.g. 0.03 for 3% (overrides analysis.risk_free_rate).
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub risk_free_rate: Option<f64>,
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "etfscope.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_is_given() {
        let base = AnalysisConfig::default();
        let merged = base
            .with_overrides(&AnalysisOverrides {
                window: Some(63),
                risk_free_rate: None,
            })
            .unwrap();
        assert_eq!(merged.window, 63);
        assert_eq!(merged.risk_free_rate, 0.02);
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = AnalysisConfig::default().with_overrides(&AnalysisOverrides {
            window: Some(0),
            risk_free_rate: None,
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn configured_etfs_are_found_ignoring_case() {
        let config = Config {
            database: DatabaseConfig { path: ":memory:".into() },
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            },
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig::default(),
            etfs: vec![InstrumentMetadata::new("ICLN", "iShares Global Clean Energy", "Energy").unwrap()],
        };
        assert_eq!(config.find_etf("icln").map(|e| e.name.as_str()), Some("iShares Global Clean Energy"));
        assert!(config.find_etf("TAN").is_none());
    }
}
