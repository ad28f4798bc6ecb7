//! Error types shared across the larder crates.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the sync core and its collaborators.
///
/// Collaborator crates (REST backend, SQLite cache) convert their own error
/// enums into one of these variants at the trait boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote backend rejected or failed a query/mutation.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The change-feed transport failed to open or close a channel.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Device-local cache failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller supplied data the operation cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
