use crate::DbError;
use chrono::NaiveDate;
use core_types::{InstrumentMetadata, PriceObservation, PricePoint, PriceSeries};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::{debug, info, warn};

/// The `EtfRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct EtfRepository {
    pool: SqlitePool,
}

/// An instrument's metadata joined with its price history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfRecord {
    pub metadata: InstrumentMetadata,
    pub prices: PriceSeries,
}

// This struct represents a row fetched from the etf_metadata table.
#[derive(Debug, FromRow)]
struct MetadataRow {
    ticker: String,
    name: Option<String>,
    theme: Option<String>,
}

impl From<MetadataRow> for InstrumentMetadata {
    fn from(row: MetadataRow) -> Self {
        Self {
            ticker: row.ticker,
            name: row.name.unwrap_or_default(),
            theme: row.theme.unwrap_or_default(),
        }
    }
}

// This struct represents a row fetched from the etf_prices table.
#[derive(Debug, FromRow)]
struct PriceRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
    dividends: Option<f64>,
    stock_splits: Option<f64>,
    capital_gains: Option<f64>,
}

impl PriceRow {
    fn into_point(self) -> Option<PricePoint> {
        Some(PricePoint {
            date: self.date,
            close: self.close?,
            open: self.open,
            high: self.high,
            low: self.low,
            volume: self.volume,
            dividends: self.dividends,
            stock_splits: self.stock_splits,
            capital_gains: self.capital_gains,
        })
    }
}

impl EtfRepository {
    /// Creates a new `EtfRepository` with a shared database connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deletes every stored price and metadata row, keeping the schema.
    ///
    /// This cannot be undone; it is used by `ingest --reset` for a clean reload.
    pub async fn clear_all(&self) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM etf_prices").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM etf_metadata").execute(&mut *tx).await?;
        tx.commit().await?;
        info!("Cleared tables 'etf_prices' and 'etf_metadata'.");
        Ok(())
    }

    /// Inserts or updates metadata rows within a single transaction.
    pub async fn save_metadata(&self, instruments: &[InstrumentMetadata]) -> Result<(), DbError> {
        if instruments.is_empty() {
            debug!("No metadata to save.");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for instrument in instruments {
            sqlx::query(
                r#"
                INSERT INTO etf_metadata (ticker, name, theme)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (ticker) DO UPDATE SET name = excluded.name, theme = excluded.theme
                "#,
            )
            .bind(&instrument.ticker)
            .bind(&instrument.name)
            .bind(&instrument.theme)
            .execute(&mut *tx) // Note: must use the transaction object `tx` here
            .await?;
        }
        tx.commit().await?;

        info!(count = instruments.len(), "Saved metadata rows to 'etf_metadata'.");
        Ok(())
    }

    /// Inserts or updates a batch of price rows for one ticker within a single transaction.
    ///
    /// The ticker must already have a metadata row. Returns the number of rows written.
    pub async fn save_prices(&self, ticker: &str, points: &[PricePoint]) -> Result<usize, DbError> {
        if points.is_empty() {
            debug!(ticker, "No price data to save.");
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(
                r#"
                INSERT INTO etf_prices (
                    date, ticker, open, high, low, close, volume,
                    dividends, stock_splits, capital_gains
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT (date, ticker) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume,
                    dividends = excluded.dividends,
                    stock_splits = excluded.stock_splits,
                    capital_gains = excluded.capital_gains
                "#,
            )
            .bind(point.date)
            .bind(ticker)
            .bind(point.open)
            .bind(point.high)
            .bind(point.low)
            .bind(point.close)
            .bind(point.volume)
            .bind(point.dividends)
            .bind(point.stock_splits)
            .bind(point.capital_gains)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(ticker, rows = points.len(), "Saved price rows to 'etf_prices'.");
        Ok(points.len())
    }

    /// Fetches the metadata of a single ticker.
    pub async fn get_instrument(&self, ticker: &str) -> Result<Option<InstrumentMetadata>, DbError> {
        let row = sqlx::query_as::<_, MetadataRow>(
            "SELECT ticker, name, theme FROM etf_metadata WHERE ticker = ?1",
        )
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Fetches an ETF's metadata together with its prices between `start` and `end` (inclusive).
    ///
    /// Returns `None` when the ticker is unknown or has no prices in the range.
    pub async fn get_etf_data(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<EtfRecord>, DbError> {
        // 1. Fetch the metadata
        let Some(metadata) = self.get_instrument(ticker).await? else {
            debug!(ticker, "No metadata found.");
            return Ok(None);
        };

        // 2. Fetch the prices
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT date, open, high, low, close, volume, dividends, stock_splits, capital_gains
            FROM etf_prices
            WHERE ticker = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            ORDER BY date ASC
            "#,
        )
        .bind(ticker)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            debug!(ticker, ?start, ?end, "No price data in the requested range.");
            return Ok(None);
        }

        // 3. Join in memory
        let total = rows.len();
        let points: Vec<PricePoint> = rows.into_iter().filter_map(PriceRow::into_point).collect();
        if points.len() < total {
            warn!(ticker, skipped = total - points.len(), "Skipped price rows without a close.");
        }
        let prices = PriceSeries::new(ticker, points)?;

        Ok(Some(EtfRecord { metadata, prices }))
    }

    /// Fetches closing prices of several tickers as a long (date, ticker, close) table.
    pub async fn get_price_table(
        &self,
        tickers: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceObservation>, DbError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT date, ticker, close FROM etf_prices WHERE close IS NOT NULL AND ticker IN (");
        let mut separated = builder.separated(", ");
        for ticker in tickers {
            separated.push_bind(ticker);
        }
        separated.push_unseparated(")");
        if let Some(start) = start {
            builder.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = end {
            builder.push(" AND date <= ").push_bind(end);
        }
        builder.push(" ORDER BY date ASC, ticker ASC");

        let rows: Vec<(NaiveDate, String, f64)> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(date, ticker, close)| PriceObservation { date, ticker, close })
            .collect())
    }

    /// Fetches the metadata of every ETF, ordered by ticker.
    pub async fn get_all_instruments(&self) -> Result<Vec<InstrumentMetadata>, DbError> {
        let rows = sqlx::query_as::<_, MetadataRow>(
            "SELECT ticker, name, theme FROM etf_metadata ORDER BY ticker ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Fetches the ETFs tagged with `theme`, ordered by ticker.
    pub async fn get_instruments_by_theme(&self, theme: &str) -> Result<Vec<InstrumentMetadata>, DbError> {
        let rows = sqlx::query_as::<_, MetadataRow>(
            "SELECT ticker, name, theme FROM etf_metadata WHERE theme = ?1 ORDER BY ticker ASC",
        )
        .bind(theme)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Fetches the distinct, non-empty themes in alphabetical order.
    pub async fn get_all_themes(&self) -> Result<Vec<String>, DbError> {
        let themes = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT theme FROM etf_metadata WHERE theme IS NOT NULL AND theme != '' ORDER BY theme ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(themes)
    }

    /// Counts the stored price rows of a ticker.
    pub async fn price_count(&self, ticker: &str) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM etf_prices WHERE ticker = ?1")
            .bind(ticker)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
