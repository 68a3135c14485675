//! AI error taxonomy and classification.
//!
//! Every failure that reaches the AI processing boundary is turned into a
//! [`ClassifiedError`] exactly once: a kind from the closed [`ErrorKind`]
//! set, the raw message (logged, never shown), a fixed user-facing message,
//! and a retryable flag that depends on the kind alone.
//!
//! Structured [`Error`] variants map directly. Free-text failures fall back
//! to ordered trigger-phrase matching, first match wins:
//!
//! | Order | Trigger | Kind |
//! |-------|---------|------|
//! | 1 | "login required", "authentication" | `AUTHENTICATION_ERROR` |
//! | 2 | "no permission", "access denied", "note not found" | `AUTHORIZATION_ERROR` |
//! | 3 | "token" together with "too long" | `TOKEN_LIMIT_EXCEEDED` |
//! | 4 | network / connection / timeout | `NETWORK_ERROR` |
//! | 5 | API / provider call | `API_ERROR` |
//! | 6 | parsing / "no output produced" | `PARSING_ERROR` |
//! | 7 | database / storage | `DATABASE_ERROR` |
//! | 8 | validation / invalid input | `VALIDATION_ERROR` |
//! | 9 | anything else | `UNKNOWN_ERROR` |

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::monitor::ErrorMonitor;

/// Closed set of AI operation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    #[serde(rename = "TOKEN_LIMIT_EXCEEDED")]
    TokenLimitExceeded,
    #[serde(rename = "API_ERROR")]
    Api,
    #[serde(rename = "PARSING_ERROR")]
    Parsing,
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication,
    #[serde(rename = "AUTHORIZATION_ERROR")]
    Authorization,
    #[serde(rename = "DATABASE_ERROR")]
    Database,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorKind {
    /// All kinds, in classification order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::TokenLimitExceeded,
        ErrorKind::Network,
        ErrorKind::Api,
        ErrorKind::Parsing,
        ErrorKind::Database,
        ErrorKind::Validation,
        ErrorKind::Unknown,
    ];

    /// Whether failures of this kind may be retried without user action.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::Authentication
                | ErrorKind::Authorization
                | ErrorKind::TokenLimitExceeded
                | ErrorKind::Validation
        )
    }

    /// Fixed user-facing message for this kind.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "The network connection is unstable. Please try again in a moment."
            }
            ErrorKind::TokenLimitExceeded => {
                "The note is too long for AI processing. Please shorten it and try again."
            }
            ErrorKind::Api => "The AI service is temporarily unavailable. Please try again shortly.",
            ErrorKind::Parsing => "The AI response could not be processed. Please try again.",
            ErrorKind::Authentication => "Login required, please sign in again.",
            ErrorKind::Authorization => "You do not have permission to access this note.",
            ErrorKind::Database => "Saving the result failed. Please try again.",
            ErrorKind::Validation => "The input is invalid. Please check it and try again.",
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
        }
    }

    /// Wire name (`NETWORK_ERROR`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::TokenLimitExceeded => "TOKEN_LIMIT_EXCEEDED",
            ErrorKind::Api => "API_ERROR",
            ErrorKind::Parsing => "PARSING_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::Database => "DATABASE_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure after classification. Immutable once built.
///
/// `Display` renders the user-facing message, so anything that surfaces a
/// classified error as text (retry state, results) never leaks raw detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    kind: ErrorKind,
    raw_message: String,
    user_message: String,
    retryable: bool,
}

impl ClassifiedError {
    /// Build a classified error of a known kind.
    pub fn new(kind: ErrorKind, raw_message: impl Into<String>) -> Self {
        Self {
            kind,
            raw_message: raw_message.into(),
            user_message: kind.user_message().to_string(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message)
    }
}

impl std::error::Error for ClassifiedError {}

impl From<&Error> for ClassifiedError {
    fn from(error: &Error) -> Self {
        classify(error)
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("classifier pattern is valid")
}

static AUTHENTICATION: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)login required|authentication|unauthenticated|not signed in|로그인")
});

static AUTHORIZATION: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)no permission|access denied|permission denied|note not found|forbidden|권한")
});

static TOKEN: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)token"));

static TOO_LONG: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)too long"));

static CONTEXT_LENGTH: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)context[ _]length|context too long|maximum context"));

static NETWORK: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)network|connection|timeout|timed out|econnrefused|econnreset|fetch failed|dns error|socket",
    )
});

static API: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\bapi\b|rate limit|too many requests|quota|overloaded|service unavailable|bad gateway|model not found|generation failed",
    )
});

static PARSING: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)pars(e|ing)|no output|empty response|unexpected format|malformed|invalid json|no usable")
});

static DATABASE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)database|storage|\bsql|constraint|transaction|persist"));

static VALIDATION: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)validation|invalid|must be|must not|exceeds the maximum"));

/// Classify a free-text failure message by ordered trigger phrases.
///
/// Total: any input, including the empty string, yields a valid
/// classification (`UNKNOWN_ERROR` when nothing matches).
pub fn classify_message(message: &str) -> ClassifiedError {
    ClassifiedError::new(match_kind(message), message)
}

fn match_kind(message: &str) -> ErrorKind {
    if AUTHENTICATION.is_match(message) {
        ErrorKind::Authentication
    } else if AUTHORIZATION.is_match(message) {
        ErrorKind::Authorization
    } else if (TOKEN.is_match(message) && TOO_LONG.is_match(message))
        || CONTEXT_LENGTH.is_match(message)
    {
        ErrorKind::TokenLimitExceeded
    } else if NETWORK.is_match(message) {
        ErrorKind::Network
    } else if API.is_match(message) {
        ErrorKind::Api
    } else if PARSING.is_match(message) {
        ErrorKind::Parsing
    } else if DATABASE.is_match(message) {
        ErrorKind::Database
    } else if VALIDATION.is_match(message) {
        ErrorKind::Validation
    } else {
        ErrorKind::Unknown
    }
}

/// Classify a structured [`Error`].
///
/// Variants that already say what went wrong map directly; provider and
/// internal failures fall back to [`classify_message`] over the rendered
/// error. A provider failure never classifies as an authentication or
/// authorization problem of the caller.
pub fn classify(error: &Error) -> ClassifiedError {
    let raw = error.to_string();
    let kind = match error {
        Error::Unauthorized(_) => ErrorKind::Authentication,
        Error::Forbidden(_) | Error::NotFound(_) => ErrorKind::Authorization,
        Error::TokenLimitExceeded { .. } => ErrorKind::TokenLimitExceeded,
        Error::Request(_) | Error::Timeout(_) => ErrorKind::Network,
        Error::Parsing(_) | Error::Serialization(_) => ErrorKind::Parsing,
        Error::Database(_) | Error::Storage(_) => ErrorKind::Database,
        Error::InvalidInput(_) => ErrorKind::Validation,
        Error::Inference(msg) => match match_kind(msg) {
            kind @ (ErrorKind::TokenLimitExceeded | ErrorKind::Network | ErrorKind::Parsing) => {
                kind
            }
            _ => ErrorKind::Api,
        },
        Error::Config(_) | Error::Internal(_) => match_kind(&raw),
    };
    ClassifiedError::new(kind, raw)
}

/// Classifier bound to an error monitor.
///
/// Classification itself is pure; every call additionally records the
/// result in the monitor, which never fails or blocks for long.
#[derive(Clone)]
pub struct ErrorClassifier {
    monitor: Arc<ErrorMonitor>,
}

impl ErrorClassifier {
    pub fn new(monitor: Arc<ErrorMonitor>) -> Self {
        Self { monitor }
    }

    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        &self.monitor
    }

    /// Classify a structured error raised by `action`.
    pub fn classify(&self, error: &Error, action: &str) -> ClassifiedError {
        self.report(classify(error), action)
    }

    /// Classify a free-text failure raised by `action`.
    pub fn classify_message(&self, message: &str, action: &str) -> ClassifiedError {
        self.report(classify_message(message), action)
    }

    /// Record a failure whose kind is fixed by where it happened.
    pub fn classify_as(&self, kind: ErrorKind, raw: impl Into<String>, action: &str) -> ClassifiedError {
        self.report(ClassifiedError::new(kind, raw), action)
    }

    fn report(&self, classified: ClassifiedError, action: &str) -> ClassifiedError {
        debug!(
            subsystem = "monitor",
            component = "classifier",
            action,
            error_kind = %classified.kind(),
            retryable = classified.retryable(),
            "Classified error"
        );
        self.monitor.record(&classified, action);
        classified
    }
}
