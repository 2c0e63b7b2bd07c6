use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use core_types::PricePoint;
use std::time::Duration;
use tracing::{debug, warn};

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::parse_chart_response;

/// The generic, abstract interface for a market-data provider.
/// The ingestion job depends on this trait only, so the HTTP implementation
/// can be swapped for a stub in tests.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetches daily price rows for `ticker` with `start <= date < end`, oldest first.
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ApiError>;
}

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) etfscope/0.1";

/// A concrete implementation of the `MarketDataClient` over the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Points the client at another host, e.g. a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, ApiError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!(ticker, %start, %end, "Requesting daily history.");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_seconds(start).to_string()),
                ("period2", unix_seconds(end).to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,splits,capitalGains".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        // Yahoo reports unknown symbols with a 404 that still carries a chart error body,
        // so the body is parsed before the status is judged.
        let status = response.status();
        let body = response.text().await?;
        let points = match parse_chart_response(&body) {
            Ok(points) => points,
            Err(ApiError::Deserialization(e)) if !status.is_success() => {
                return Err(ApiError::InvalidData(format!("HTTP {status}: {e}")));
            }
            Err(e) => return Err(e),
        };

        let points: Vec<PricePoint> = points
            .into_iter()
            .filter(|p| p.date >= start && p.date < end)
            .collect();
        if points.is_empty() {
            warn!(ticker, %start, %end, "No data found for the requested range.");
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bounds_are_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(unix_seconds(date), 1_709_251_200);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = YahooClient::with_base_url("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
