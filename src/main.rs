use analytics::{AnalyticsEngine, MetricParams};
use anyhow::{Context, bail};
use api_client::YahooClient;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use configuration::{AnalysisOverrides, Config, init_tracing, load_config};
use core_types::{InstrumentMetadata, Period, PriceSeries};
use database::{EtfRepository, connect, run_migrations};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod display;
mod ingest;

/// The main entry point for the etfscope application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load ETFSCOPE__* overrides from a .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let analysis = config.analysis.with_overrides(&cli.overrides)?;

    // Keep the guard alive until exit so buffered log lines reach the file.
    let _guard = init_tracing(&config.logging)?;

    // Initialize the database connection and run migrations
    let db_pool = connect(&config.database.path).await?;
    run_migrations(&db_pool).await?;
    let repo = EtfRepository::new(db_pool);

    let engine = AnalyticsEngine::new(MetricParams {
        window: analysis.window,
        risk_free_rate: analysis.risk_free_rate,
    });

    // Execute the appropriate command
    match cli.command {
        Commands::Ingest { reset } => {
            let client = Arc::new(YahooClient::new()?);
            let summary = ingest::handle_ingest(&config, repo, client, reset).await?;
            if !summary.failed.is_empty() {
                warn!(failed = ?summary.failed, "Some ETFs could not be ingested.");
            }
        }
        Commands::Analyze(args) => handle_analyze(args, &repo, &engine).await?,
        Commands::Compare(args) => handle_compare(args, &config, &repo, &engine).await?,
        Commands::List { theme } => {
            let instruments = match theme {
                Some(theme) => repo.get_instruments_by_theme(&theme).await?,
                None => repo.get_all_instruments().await?,
            };
            if instruments.is_empty() {
                warn!("No ETFs stored yet. Run `etfscope ingest` first.");
            }
            display::print_instruments(&instruments);
        }
        Commands::Themes => {
            for theme in repo.get_all_themes().await? {
                println!("{theme}");
            }
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Risk and return analytics for thematic ETFs.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: AnalysisOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the configured ETFs' history into the database.
    Ingest {
        /// Delete all stored data before downloading.
        #[arg(long)]
        reset: bool,
    },
    /// Show the metrics of a single ETF.
    Analyze(AnalyzeArgs),
    /// Compare several ETFs side by side.
    Compare(CompareArgs),
    /// List the stored ETFs.
    List {
        /// Only show ETFs with this theme.
        #[arg(long)]
        theme: Option<String>,
    },
    /// List the distinct themes of the stored ETFs.
    Themes,
}

/// The date range of a query: a named period, or explicit bounds.
#[derive(clap::Args)]
struct RangeArgs {
    /// Analysis period: 1m, 3m, 6m, YTD, 1a, 3a, 5a or MAX.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    period: Option<Period>,

    /// Start date (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    /// Resolves to inclusive bounds; no option at all means the whole history.
    fn resolve(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self.period {
            Some(period) => {
                let (start, end) = period.date_range(today);
                (Some(start), Some(end))
            }
            None => (self.from, self.to),
        }
    }
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// The ETF to analyze (e.g., "ICLN").
    #[arg(long)]
    ticker: String,

    /// A second ETF to compute beta and tracking error against.
    #[arg(long)]
    benchmark: Option<String>,

    #[command(flatten)]
    range: RangeArgs,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct CompareArgs {
    /// The ETFs to compare. Defaults to every configured ETF.
    #[arg(long, num_args = 1..)]
    tickers: Vec<String>,

    #[command(flatten)]
    range: RangeArgs,

    /// Print the report as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_analyze(
    args: AnalyzeArgs,
    repo: &EtfRepository,
    engine: &AnalyticsEngine,
) -> anyhow::Result<()> {
    let (start, end) = args.range.resolve(Local::now().date_naive());
    let Some(record) = repo.get_etf_data(&args.ticker, start, end).await? else {
        bail!("no data stored for {} in the selected range", args.ticker);
    };

    let summary = engine.summarize(&record.metadata, &record.prices);

    let benchmark = match &args.benchmark {
        Some(ticker) => match repo.get_etf_data(ticker, start, end).await? {
            Some(bench) => Some(engine.relative_to(&record.prices, &bench.prices)),
            None => {
                warn!(benchmark = %ticker, "No benchmark data in the selected range.");
                None
            }
        },
        None => None,
    };

    if args.json {
        let report = serde_json::json!({ "summary": summary, "benchmark": benchmark });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_summary(&summary, engine.params(), benchmark.as_ref());
    }
    Ok(())
}

async fn handle_compare(
    args: CompareArgs,
    config: &Config,
    repo: &EtfRepository,
    engine: &AnalyticsEngine,
) -> anyhow::Result<()> {
    let tickers: Vec<String> = if args.tickers.is_empty() {
        config.tickers().into_iter().map(String::from).collect()
    } else {
        args.tickers
    };
    if tickers.is_empty() {
        bail!("no tickers to compare");
    }

    let (start, end) = args.range.resolve(Local::now().date_naive());
    let table = repo.get_price_table(&tickers, start, end).await?;

    // Regroup the long table into one series per ticker.
    let mut closes: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for observation in table {
        closes
            .entry(observation.ticker)
            .or_default()
            .push((observation.date, observation.close));
    }

    let mut instruments: Vec<(InstrumentMetadata, PriceSeries)> = Vec::new();
    for ticker in &tickers {
        let Some(points) = closes.remove(ticker) else {
            warn!(ticker, "No price data in the selected range; skipping.");
            continue;
        };
        // Stored metadata wins; a configured but never ingested ETF still gets its name.
        let metadata = match repo.get_instrument(ticker).await? {
            Some(metadata) => metadata,
            None => match config.find_etf(ticker) {
                Some(metadata) => metadata.clone(),
                None => InstrumentMetadata::new(ticker.as_str(), "", "")?,
            },
        };
        instruments.push((metadata, PriceSeries::from_closes(ticker.as_str(), points)?));
    }
    if instruments.is_empty() {
        bail!("none of the requested ETFs has data in the selected range");
    }

    info!(instruments = instruments.len(), ?start, ?end, "Comparing ETFs.");
    let report = engine.compare(&instruments);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_comparison(&report);
    }
    Ok(())
}
