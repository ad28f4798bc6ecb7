//! Error types for the backend client.

use thiserror::Error;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, CloudError>;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the REST API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or malformed credentials
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl CloudError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}

impl From<CloudError> for larder_core::Error {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Json(err) => larder_core::Error::Serialization(err),
            CloudError::InvalidRequest(message) => larder_core::Error::InvalidInput(message),
            other => larder_core::Error::backend(other.to_string()),
        }
    }
}
