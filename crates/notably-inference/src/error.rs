//! Provider-specific error handling.
//!
//! Maps HTTP failures from a text-generation provider onto notably errors
//! whose classification is stable: context-length rejections become token
//! limit failures, everything else the provider reports becomes an API
//! failure. Transport failures are handled by `From<reqwest::Error>`.

use notably_core::Error;

/// Provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
    /// Provider rejected our credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Prompt exceeds the model context window.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl ProviderErrorCode {
    /// Determine error code from HTTP status and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let body = body.to_lowercase();
        match status {
            401 | 403 => Self::AuthenticationError,
            429 => Self::RateLimitExceeded,
            404 => Self::ModelNotFound,
            400 | 413
                if body.contains("context") || body.contains("too long") || status == 413 =>
            {
                Self::ContextLengthExceeded
            }
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Convert a provider error to a notably Error.
pub fn to_notably_error(code: ProviderErrorCode, message: &str) -> Error {
    match code {
        ProviderErrorCode::AuthenticationError => {
            Error::Inference(format!("API credentials rejected: {}", message))
        }
        ProviderErrorCode::RateLimitExceeded => {
            Error::Inference(format!("API rate limit exceeded: {}", message))
        }
        ProviderErrorCode::ModelNotFound => {
            Error::Inference(format!("API model not found: {}", message))
        }
        ProviderErrorCode::ContextLengthExceeded => {
            Error::Inference(format!("Context length exceeded, token input too long: {}", message))
        }
        ProviderErrorCode::ServerError => Error::Inference(format!("API server error: {}", message)),
        ProviderErrorCode::Unknown => Error::Inference(format!("API call failed: {}", message)),
    }
}
