//! Deserialization of the Yahoo Finance `v8/finance/chart` payload.

use crate::error::ApiError;
use chrono::{DateTime, NaiveDate};
use core_types::PricePoint;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ProviderError>,
}

/// The error object Yahoo embeds in an otherwise well-formed response.
#[derive(Debug, Deserialize)]
pub struct ProviderError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub events: Events,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    /// Offset of the exchange's local time from UTC, in seconds.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Events {
    #[serde(default)]
    pub dividends: HashMap<String, CashEvent>,
    #[serde(default)]
    pub splits: HashMap<String, SplitEvent>,
    #[serde(default)]
    pub capital_gains: HashMap<String, CashEvent>,
}

#[derive(Debug, Deserialize)]
pub struct CashEvent {
    pub amount: f64,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct SplitEvent {
    pub date: i64,
    pub numerator: f64,
    pub denominator: f64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

// Every field is a column aligned with `timestamp`; holidays and halts show up as nulls.
#[derive(Debug, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

/// Parses a raw chart response into daily price rows, oldest first.
///
/// Prices are dividend- and split-adjusted: when an adjusted close is present,
/// open, high and low are scaled by the same factor as the close. Rows without a
/// close are dropped. Corporate actions are attached to the row of the same
/// exchange-local date.
pub fn parse_chart_response(body: &str) -> Result<Vec<PricePoint>, ApiError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        return Err(ApiError::Provider {
            code: error.code,
            description: error.description,
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = result.meta.gmtoffset;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjusted = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let dividends = by_date(result.events.dividends.values().map(|e| (e.date, e.amount)), offset)?;
    let gains = by_date(result.events.capital_gains.values().map(|e| (e.date, e.amount)), offset)?;
    let splits = by_date(
        result
            .events
            .splits
            .values()
            .filter(|s| s.denominator != 0.0)
            .map(|s| (s.date, s.numerator / s.denominator)),
        offset,
    )?;

    let column = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    // BTreeMap keeps rows ordered and collapses the rare duplicate date Yahoo emits for the live bar.
    let mut rows: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        let Some(raw_close) = column(&quote.close, i) else {
            continue;
        };
        let date = local_date(timestamp, offset)?;
        let close = column(&adjusted, i).unwrap_or(raw_close);
        let factor = if raw_close != 0.0 { close / raw_close } else { 1.0 };

        rows.insert(
            date,
            PricePoint {
                date,
                close,
                open: column(&quote.open, i).map(|v| v * factor),
                high: column(&quote.high, i).map(|v| v * factor),
                low: column(&quote.low, i).map(|v| v * factor),
                volume: quote.volume.get(i).copied().flatten(),
                dividends: Some(dividends.get(&date).copied().unwrap_or(0.0)),
                stock_splits: Some(splits.get(&date).copied().unwrap_or(0.0)),
                capital_gains: Some(gains.get(&date).copied().unwrap_or(0.0)),
            },
        );
    }

    Ok(rows.into_values().collect())
}

fn local_date(timestamp: i64, offset: i64) -> Result<NaiveDate, ApiError> {
    DateTime::from_timestamp(timestamp + offset, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ApiError::InvalidData(format!("timestamp out of range: {timestamp}")))
}

fn by_date(
    events: impl Iterator<Item = (i64, f64)>,
    offset: i64,
) -> Result<HashMap<NaiveDate, f64>, ApiError> {
    let mut map = HashMap::new();
    for (timestamp, value) in events {
        *map.entry(local_date(timestamp, offset)?).or_insert(0.0) += value;
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-01 14:30 UTC and the two following sessions, NYSE offset -5h.
    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "ICLN", "currency": "USD", "gmtoffset": -18000 },
                "timestamp": [1709303400, 1709562600, 1709649000, 1709735400],
                "events": {
                    "dividends": { "1709562600": { "amount": 0.25, "date": 1709562600 } },
                    "splits": { "1709649000": { "date": 1709649000, "numerator": 2, "denominator": 1, "splitRatio": "2:1" } }
                },
                "indicators": {
                    "quote": [{
                        "open":   [10.0, 11.0, null, 12.0],
                        "high":   [10.5, 11.5, null, 12.5],
                        "low":    [9.5, 10.5, null, 11.5],
                        "close":  [10.0, 11.0, null, 12.0],
                        "volume": [1000, 2000, null, 3000]
                    }],
                    "adjclose": [{ "adjclose": [9.0, 11.0, null, 12.0] }]
                }
            }],
            "error": null
        }
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rows_without_a_close_are_dropped() {
        let points = parse_chart_response(CHART).unwrap();
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 3, 4), date(2024, 3, 6)]);
        assert_eq!(points[2].volume, Some(3000));
    }

    #[test]
    fn prices_are_adjusted_by_the_adjusted_close() {
        let points = parse_chart_response(CHART).unwrap();
        assert_eq!(points[0].close, 9.0);
        assert_eq!(points[0].open, Some(9.0));
        assert_eq!(points[0].high, Some(10.5 * 0.9));
        assert_eq!(points[1].close, 11.0);
    }

    #[test]
    fn corporate_actions_land_on_their_local_date() {
        let points = parse_chart_response(CHART).unwrap();
        assert_eq!(points[0].dividends, Some(0.0));
        assert_eq!(points[1].dividends, Some(0.25));
        // The split falls on a session without a close, so no row carries it.
        assert!(points.iter().all(|p| p.stock_splits == Some(0.0)));
    }

    #[test]
    fn provider_errors_are_surfaced() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart_response(body) {
            Err(ApiError::Provider { code, description }) => {
                assert_eq!(code, "Not Found");
                assert!(description.contains("delisted"));
            }
            other => panic!("expected a provider error, got {other:?}"),
        }
    }

    #[test]
    fn a_result_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"NEW"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart_response(body).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        assert!(matches!(
            parse_chart_response("<html>rate limited</html>"),
            Err(ApiError::Deserialization(_))
        ));
    }
}
