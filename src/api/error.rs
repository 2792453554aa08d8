use thiserror::Error;

/// Failure taxonomy for API operations.
///
/// Transport failures, non-success statuses, and body decoding are kept
/// distinct so callers can decide what is retryable and what is terminal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned status {status}")]
    Http { status: u16 },
    #[error("post {id} does not exist")]
    NotFound { id: i64 },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Transport-level failures are the only retryable class.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
