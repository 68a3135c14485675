//! In-process error monitor for classified AI failures.
//!
//! Counts failures by kind and by calling action, keeps a rolling window of
//! recent entries, and aggregates how often retried sequences eventually
//! succeed. Recording never fails and never panics: a poisoned lock is
//! recovered rather than propagated.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::classify::{ClassifiedError, ErrorKind};
use crate::defaults::MONITOR_RECENT_CAPACITY;

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub action: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Point-in-time copy of the monitor's aggregates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub total_errors: u64,
    pub by_kind: HashMap<ErrorKind, u64>,
    pub by_action: HashMap<String, u64>,
    pub recent: Vec<ErrorEntry>,
    pub retry_attempts: u64,
    pub retried_sequences: u64,
    pub retried_successes: u64,
    pub retry_success_rate: f64,
}

#[derive(Debug, Default)]
struct MonitorState {
    total_errors: u64,
    by_kind: HashMap<ErrorKind, u64>,
    by_action: HashMap<String, u64>,
    recent: VecDeque<ErrorEntry>,
    retry_attempts: u64,
    retried_sequences: u64,
    retried_successes: u64,
}

impl MonitorState {
    fn success_rate(&self) -> f64 {
        if self.retried_sequences == 0 {
            1.0
        } else {
            self.retried_successes as f64 / self.retried_sequences as f64
        }
    }
}

/// Error-monitoring sink shared by classifiers and retry handles.
#[derive(Debug)]
pub struct ErrorMonitor {
    state: Mutex<MonitorState>,
    capacity: usize,
}

impl Default for ErrorMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorMonitor {
    pub fn new() -> Self {
        Self::with_capacity(MONITOR_RECENT_CAPACITY)
    }

    /// Create a monitor keeping at most `capacity` recent entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MonitorState::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a classified failure raised by `action`.
    pub fn record(&self, error: &ClassifiedError, action: &str) {
        warn!(
            subsystem = "monitor",
            component = "error_monitor",
            action,
            error_kind = %error.kind(),
            retryable = error.retryable(),
            error = error.raw_message(),
            "AI operation error"
        );

        let mut state = self.lock();
        state.total_errors += 1;
        *state.by_kind.entry(error.kind()).or_insert(0) += 1;
        *state.by_action.entry(action.to_string()).or_insert(0) += 1;
        if state.recent.len() == self.capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(ErrorEntry {
            kind: error.kind(),
            action: action.to_string(),
            message: error.raw_message().to_string(),
            at: Utc::now(),
        });
    }

    /// Count one retry (an attempt after the first).
    pub fn record_retry_attempt(&self) {
        self.lock().retry_attempts += 1;
    }

    /// Record how a sequence that needed at least one retry ended.
    pub fn record_retry_outcome(&self, success: bool) {
        let mut state = self.lock();
        state.retried_sequences += 1;
        if success {
            state.retried_successes += 1;
        }
    }

    /// Share of retried sequences that eventually succeeded (1.0 when none).
    pub fn retry_success_rate(&self) -> f64 {
        self.lock().success_rate()
    }

    pub fn count_for_kind(&self, kind: ErrorKind) -> u64 {
        self.lock().by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn count_for_action(&self, action: &str) -> u64 {
        self.lock().by_action.get(action).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let state = self.lock();
        MonitorSnapshot {
            total_errors: state.total_errors,
            by_kind: state.by_kind.clone(),
            by_action: state.by_action.clone(),
            recent: state.recent.iter().cloned().collect(),
            retry_attempts: state.retry_attempts,
            retried_sequences: state.retried_sequences,
            retried_successes: state.retried_successes,
            retry_success_rate: state.success_rate(),
        }
    }

    pub fn reset(&self) {
        *self.lock() = MonitorState::default();
    }
}
