use reqwest::StatusCode;

/// Failure of a single Remote Client call.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0} was not found")]
    NotFound(String),
    #[error("request to {url} failed with status {status}")]
    Status { status: StatusCode, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid API url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Raised by in-memory implementations of the client.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
