use api_client::MarketDataClient;
use configuration::Config;
use database::EtfRepository;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of an ingestion run.
#[derive(Debug, Default, PartialEq)]
pub struct IngestSummary {
    /// (ticker, rows written) for every ETF that was fetched and stored.
    pub stored: Vec<(String, usize)>,
    /// Tickers whose fetch or write failed.
    pub failed: Vec<String>,
}

/// Downloads the configured ETFs and upserts them into the database.
///
/// Every ETF is fetched in its own task. A failure is logged and recorded in
/// the summary without aborting the others.
pub async fn handle_ingest(
    config: &Config,
    repo: EtfRepository,
    client: Arc<dyn MarketDataClient>,
    reset: bool,
) -> anyhow::Result<IngestSummary> {
    let (start, end) = (config.date_range.start, config.date_range.end);
    info!(etfs = config.etfs.len(), %start, %end, reset, "Starting ingestion.");

    if reset {
        repo.clear_all().await?;
    }
    // Prices reference their ticker, so the metadata goes in first.
    repo.save_metadata(&config.etfs).await?;

    // Set up the progress bar
    let progress_bar = ProgressBar::new(config.etfs.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // Create concurrent tasks for each ETF
    let tasks: Vec<_> = config
        .etfs
        .iter()
        .map(|etf| {
            let client = Arc::clone(&client);
            let repo = repo.clone();
            let ticker = etf.ticker.clone();
            let pb = progress_bar.clone();

            tokio::spawn(async move {
                pb.set_message(format!("Fetching {ticker}..."));
                let result = async {
                    let points = client.fetch_daily_history(&ticker, start, end).await?;
                    if points.is_empty() {
                        warn!(ticker = %ticker, "Provider returned no rows.");
                    }
                    let written = repo.save_prices(&ticker, &points).await?;
                    Ok::<usize, anyhow::Error>(written)
                }
                .await;
                pb.inc(1);
                (ticker, result)
            })
        })
        .collect();

    // Wait for all concurrent tasks to complete
    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Ingestion complete!");

    let mut summary = IngestSummary::default();
    for result in results {
        match result {
            Ok((ticker, Ok(rows))) => summary.stored.push((ticker, rows)),
            Ok((ticker, Err(e))) => {
                error!(ticker = %ticker, error = %e, "Ingestion failed.");
                summary.failed.push(ticker);
            }
            Err(e) => error!(error = %e, "An ingestion task panicked."),
        }
    }

    info!(
        stored = summary.stored.len(),
        failed = summary.failed.len(),
        rows = summary.stored.iter().map(|(_, n)| n).sum::<usize>(),
        "Ingestion finished."
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use configuration::{AnalysisConfig, DatabaseConfig, DateRange, LoggingConfig};
    use core_types::{InstrumentMetadata, PricePoint};
    use database::{connect_in_memory, run_migrations};

    /// Serves three rising closes for every ticker except "FAIL".
    struct StubClient;

    #[async_trait]
    impl MarketDataClient for StubClient {
        async fn fetch_daily_history(
            &self,
            ticker: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PricePoint>, ApiError> {
            if ticker == "FAIL" {
                return Err(ApiError::Provider {
                    code: "Not Found".to_string(),
                    description: "No data found".to_string(),
                });
            }
            Ok((0..3)
                .map(|i| PricePoint::close_only(start + chrono::Duration::days(i), 10.0 + i as f64))
                .collect())
        }
    }

    fn config(tickers: &[&str]) -> Config {
        Config {
            database: DatabaseConfig { path: ":memory:".into() },
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            },
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig::default(),
            etfs: tickers
                .iter()
                .map(|t| InstrumentMetadata::new(*t, format!("{t} ETF"), "Test").unwrap())
                .collect(),
        }
    }

    async fn repository() -> EtfRepository {
        let pool = connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        EtfRepository::new(pool)
    }

    #[tokio::test]
    async fn one_failing_etf_does_not_abort_the_others() {
        let repo = repository().await;
        let summary = handle_ingest(&config(&["ICLN", "FAIL", "TAN"]), repo.clone(), Arc::new(StubClient), false)
            .await
            .unwrap();

        let mut stored = summary.stored.clone();
        stored.sort();
        assert_eq!(stored, vec![("ICLN".to_string(), 3), ("TAN".to_string(), 3)]);
        assert_eq!(summary.failed, vec!["FAIL".to_string()]);

        assert_eq!(repo.price_count("ICLN").await.unwrap(), 3);
        // Metadata is stored even when the price fetch fails.
        assert!(repo.get_instrument("FAIL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_removes_etfs_no_longer_configured() {
        let repo = repository().await;
        handle_ingest(&config(&["OLD"]), repo.clone(), Arc::new(StubClient), false)
            .await
            .unwrap();
        handle_ingest(&config(&["NEW"]), repo.clone(), Arc::new(StubClient), true)
            .await
            .unwrap();

        let tickers: Vec<String> = repo
            .get_all_instruments()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.ticker)
            .collect();
        assert_eq!(tickers, vec!["NEW"]);
        assert_eq!(repo.price_count("OLD").await.unwrap(), 0);
    }
}
