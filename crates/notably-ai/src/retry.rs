//! Retry engine with exponential backoff and jitter.
//!
//! A [`RetryHandle`] runs one logical operation at a time and exposes its
//! [`RetryState`] for status displays. Attempts are strictly sequential: the
//! next attempt starts only after the previous failure has been observed and
//! the backoff delay has elapsed. Independent operations use independent
//! handles and share nothing.
//!
//! Delay before attempt `n + 1` is `base_delay * 2^(n-1)` plus uniform
//! jitter in `[0, max_jitter]`.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use notably_core::defaults::{AI_MAX_RETRIES, AI_RETRY_BASE_DELAY_MS, AI_RETRY_MAX_JITTER_MS};
use notably_core::ErrorMonitor;

/// Backoff parameters for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: AI_MAX_RETRIES,
            base_delay: Duration::from_millis(AI_RETRY_BASE_DELAY_MS),
            max_jitter: Duration::from_millis(AI_RETRY_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following failed attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        backoff.saturating_add(Duration::from_millis(jitter))
    }
}

/// Observable progress of the current retry sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    pub is_retrying: bool,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub can_retry: bool,
}

impl RetryState {
    pub fn initial(max_retries: u32) -> Self {
        Self {
            is_retrying: false,
            retry_count: 0,
            max_retries,
            last_error: None,
            can_retry: true,
        }
    }

    /// True once every attempt of the sequence has failed.
    pub fn is_exhausted(&self) -> bool {
        !self.can_retry && self.retry_count >= self.max_retries
    }
}

/// Receives retry lifecycle events. All methods default to no-ops.
pub trait RetryObserver: Send + Sync {
    /// Attempt `attempt` (1-indexed) is about to start.
    fn on_attempt(&self, _attempt: u32) {}

    /// Attempt `attempt` failed and the next one starts after `delay`.
    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &str) {}

    /// The sequence succeeded on attempt `attempts`.
    fn on_success(&self, _attempts: u32) {}

    /// The sequence stopped early on an error that must not be retried.
    fn on_non_retryable(&self, _attempts: u32, _error: &str) {}

    /// Every attempt failed.
    fn on_max_retries_reached(&self, _attempts: u32, _error: &str) {}
}

impl RetryObserver for ErrorMonitor {
    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &str) {
        self.record_retry_attempt();
    }

    fn on_success(&self, attempts: u32) {
        if attempts > 1 {
            self.record_retry_outcome(true);
        }
    }

    fn on_non_retryable(&self, attempts: u32, _error: &str) {
        if attempts > 1 {
            self.record_retry_outcome(false);
        }
    }

    fn on_max_retries_reached(&self, attempts: u32, _error: &str) {
        if attempts > 1 {
            self.record_retry_outcome(false);
        }
    }
}

/// Single-flight retry runner owning one [`RetryState`].
pub struct RetryHandle {
    policy: RetryPolicy,
    state: Mutex<RetryState>,
    observers: Vec<Arc<dyn RetryObserver>>,
    label: String,
}

impl Default for RetryHandle {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryHandle {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(RetryState::initial(policy.max_retries)),
            policy,
            observers: Vec::new(),
            label: "operation".to_string(),
        }
    }

    /// Name used in log events.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RetryState {
        self.lock().clone()
    }

    /// Clear all state without running anything.
    pub fn reset(&self) {
        *self.lock() = RetryState::initial(self.policy.max_retries);
    }

    /// Run `operation` with backoff; `retryable == false` allows one attempt.
    pub async fn execute<T, E, F, Fut>(&self, retryable: bool, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_when(|_: &E| retryable, operation).await
    }

    /// Start a fresh sequence after exhaustion, ignoring the old counter.
    pub async fn manual_retry<T, E, F, Fut>(&self, retryable: bool, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        info!(
            subsystem = "ai",
            component = "retry",
            op = %self.label,
            "Manual retry requested"
        );
        self.execute(retryable, operation).await
    }

    /// Run `operation` with backoff, retrying only errors accepted by
    /// `should_retry`. Fails with the last error once attempts run out.
    pub async fn execute_when<T, E, F, Fut, P>(
        &self,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        self.reset();
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempt = 1u32;

        loop {
            {
                let mut state = self.lock();
                state.is_retrying = attempt > 1;
                state.retry_count = attempt - 1;
            }
            self.notify(|o| o.on_attempt(attempt));

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            subsystem = "ai",
                            component = "retry",
                            op = %self.label,
                            attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    self.reset();
                    self.notify(|o| o.on_success(attempt));
                    return Ok(value);
                }
                Err(e) => e,
            };

            let message = error.to_string();

            if attempt >= max_attempts {
                {
                    let mut state = self.lock();
                    state.last_error = Some(message.clone());
                    state.is_retrying = false;
                    state.can_retry = false;
                    state.retry_count = attempt;
                }
                warn!(
                    subsystem = "ai",
                    component = "retry",
                    op = %self.label,
                    attempt,
                    max_retries = self.policy.max_retries,
                    error = %message,
                    "Retries exhausted"
                );
                self.notify(|o| o.on_max_retries_reached(attempt, &message));
                return Err(error);
            }

            {
                let mut state = self.lock();
                state.last_error = Some(message.clone());
                state.can_retry = true;
            }

            if !should_retry(&error) {
                self.lock().is_retrying = false;
                debug!(
                    subsystem = "ai",
                    component = "retry",
                    op = %self.label,
                    attempt,
                    error = %message,
                    "Error is not retryable, giving up"
                );
                self.notify(|o| o.on_non_retryable(attempt, &message));
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                subsystem = "ai",
                component = "retry",
                op = %self.label,
                attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "Attempt failed, retrying"
            );
            self.notify(|o| o.on_retry(attempt, delay, &message));
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notify(&self, event: impl Fn(&dyn RetryObserver)) {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }
}
