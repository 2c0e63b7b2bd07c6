//! # etfscope Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! SQLite database holding ETF metadata and price history.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate encapsulates all database-specific logic. It
//!   provides a clean API to the rest of the application, hiding the SQL.
//! - **Two Tables:** `etf_metadata` (one row per ticker) and `etf_prices` (one row
//!   per ticker and date). The schema lives in `./migrations`.
//! - **Asynchronous & Pooled:** All operations are asynchronous and go through a
//!   `SqlitePool`, so the ingest command can write several tickers concurrently.
//!
//! ## Public API
//!
//! - `connect` / `connect_in_memory`: establish the connection pool.
//! - `run_migrations`: apply the schema.
//! - `EtfRepository`: all data access methods (`save_prices`, `get_etf_data`, ...).
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_in_memory, run_migrations};
pub use error::DbError;
pub use repository::{EtfRecord, EtfRepository};
