use core_types::{DatePolicy, NavPolicy};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub load: LoadConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Where the NAV document is fetched from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the API; the scheme code is appended as the last path segment.
    pub base_url: String,
    /// The scheme to load when none is given on the command line.
    pub scheme_code: Option<i64>,
    pub timeout_secs: u64,
}

/// Parameters of the batch loading pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Records inserted per transaction.
    pub batch_size: usize,
    /// Maximum number of batch transactions open at the same time.
    pub concurrency: usize,
    pub on_bad_date: DatePolicy,
    pub nav_parsing: NavPolicy,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mfapi.in/mf".to_string(),
            scheme_code: None,
            timeout_secs: 30,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            concurrency: 8,
            on_bad_date: DatePolicy::default(),
            nav_parsing: NavPolicy::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            acquire_timeout_secs: 5,
            max_lifetime_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LoadConfig {
    pub fn batch_size(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.batch_size).ok_or_else(|| {
            ConfigError::ValidationError("load.batch_size must be a positive integer".to_string())
        })
    }

    pub fn concurrency(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.concurrency).ok_or_else(|| {
            ConfigError::ValidationError("load.concurrency must be a positive integer".to_string())
        })
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct LoadOverrides {
    /// The scheme code to fetch (e.g. 120465).
    #[cfg_attr(feature = "clap", arg(long))]
    pub scheme_code: Option<i64>,

    /// Records per insert transaction.
    #[cfg_attr(feature = "clap", arg(long))]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batch transactions.
    #[cfg_attr(feature = "clap", arg(long))]
    pub concurrency: Option<usize>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: &LoadOverrides) {
        if let Some(code) = overrides.scheme_code {
            self.source.scheme_code = Some(code);
        }
        if let Some(size) = overrides.batch_size {
            self.load.batch_size = size;
        }
        if let Some(limit) = overrides.concurrency {
            self.load.concurrency = limit;
        }
    }

    /// Checks the values the loader cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.load.batch_size()?;
        self.load.concurrency()?;
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "source.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
