use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalysisConfig, AnalysisOverrides, Config, DatabaseConfig, DateRange, LoggingConfig,
};

/// Environment variables with this prefix override file values,
/// e.g. `ETFSCOPE__DATABASE__PATH=/tmp/etf.db`.
pub const ENV_PREFIX: &str = "ETFSCOPE";

/// Loads the application configuration from a TOML file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// layers `ETFSCOPE__*` environment overrides on top, deserializes it into our strongly-typed
/// `Config` struct and validates it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
