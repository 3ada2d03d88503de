use thiserror::Error;

/// Failures while fetching the source document. All of them are fatal to a run.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    #[error("The API returned status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(#[from] serde_json::Error),
}
