use core_types::FundId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to begin a transaction: {0}")]
    BeginTransaction(#[source] sqlx::Error),

    #[error("Failed to insert into {table}: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to commit the transaction: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("Failed to truncate tables: {0}")]
    Truncate(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("A batch of {rows} rows needs {params} bind parameters, above the limit of {limit}")]
    BatchTooLarge { rows: usize, params: usize, limit: usize },

    #[error("Fund {0} does not exist")]
    MissingFund(FundId),

    #[error("The requested data was not found in the database.")]
    NotFound,
}
