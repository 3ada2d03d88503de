use api_client::error::ApiError;
use configuration::error::ConfigError;
use core_types::ParseError;
use database::DbError;
use thiserror::Error;

/// Errors that stop a run or an administrative operation.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch the NAV document: {0}")]
    Fetch(#[from] ApiError),

    #[error("Failed to normalize NAV records: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to insert the fund: {0}")]
    Insert(#[source] DbError),

    #[error("Store error: {0}")]
    Store(#[source] DbError),

    #[error("Failed to serialize the export: {0}")]
    Export(#[from] serde_json::Error),
}

/// Why a single batch did not commit. Never raised past the executor.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{0}")]
    Store(#[from] DbError),

    #[error("Batch task panicked: {0}")]
    Panicked(String),

    #[error("Batch task ended without reporting an outcome")]
    Lost,
}
