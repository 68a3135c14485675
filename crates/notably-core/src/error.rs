//! Error types for notably.

use thiserror::Error;

/// Result type alias using notably's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notably operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage backend failed outside of sqlx (in-memory store, injected faults)
    #[error("Database error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No authenticated caller
    #[error("Login required: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (or the note does not exist for this caller)
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Input is estimated to exceed the model's token budget
    #[error("Token limit exceeded: input too long ({estimated} estimated tokens, limit {limit})")]
    TokenLimitExceeded { estimated: usize, limit: usize },

    /// Inference/generation failed at the provider
    #[error("AI API error: {0}")]
    Inference(String),

    /// A provider response could not be turned into a usable result
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// HTTP/network request failed
    #[error("Network error: {0}")]
    Request(String),

    /// An external call did not finish in time
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Invalid input
    #[error("Validation error: invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
