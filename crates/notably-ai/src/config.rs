//! Runtime configuration for AI processing.

use std::time::Duration;

/// Environment variable holding the per-attempt timeout in seconds.
pub const ATTEMPT_TIMEOUT_ENV: &str = "NOTABLY_AI_ATTEMPT_TIMEOUT_SECS";

/// Environment variable overriding the model label stored with AI summaries.
pub const SUMMARY_MODEL_LABEL_ENV: &str = "NOTABLY_AI_SUMMARY_MODEL_LABEL";

/// Default per-attempt timeout (seconds).
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// Upper bound for one external generation call; `None` disables it.
    pub attempt_timeout: Option<Duration>,
    /// Label stored with generated summaries; the backend's model name when unset.
    pub summary_model_label: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Some(Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS)),
            summary_model_label: None,
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        let attempt_timeout = match std::env::var(ATTEMPT_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS)),
        };

        let summary_model_label = std::env::var(SUMMARY_MODEL_LABEL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            attempt_timeout,
            summary_model_label,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_summary_model_label(mut self, label: impl Into<String>) -> Self {
        self.summary_model_label = Some(label.into());
        self
    }
}
