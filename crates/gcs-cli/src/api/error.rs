//! Errors returned by the environments API client

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The credential was rejected; the user has to authorize again
    #[error("Unauthorized or token has expired, please reauthorize")]
    Unauthorized,

    /// Network or HTTP level failure
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("Failed to decode API response (HTTP {status}): {source}")]
    Decode {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-success status for an operation with no status body of interest
    #[error("API request failed with status code {status}: {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
