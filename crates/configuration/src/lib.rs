use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{Config, DatabaseConfig, LoadConfig, LoadOverrides, LoggingConfig, SourceConfig};

/// Loads the application configuration.
///
/// Values come from `navloader.toml` in the working directory (or the given
/// file, which must then exist) and are overridden by `NAVLOADER__*`
/// environment variables, e.g. `NAVLOADER__LOAD__BATCH_SIZE=500`. Every key
/// has a default, so running without a file is fine.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("navloader").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("NAVLOADER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
