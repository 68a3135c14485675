//! # notably-ai
//!
//! Reliable AI processing of notes: summaries and tags generated by an
//! external model, wrapped in retry with backoff, error classification,
//! partial-success aggregation, and backup/rollback.
//!
//! This crate provides:
//! - [`RetryHandle`]: exponential backoff with jitter and observable state
//! - [`BackupStore`]: time-expiring snapshots of a note's summary and tags
//! - [`generate_both_with_backup`]: combined processing that restores only
//!   what a failed run left different
//! - [`AiOperations`]: the summary, tags, combined, and manual-edit operations
//! - [`AiConfig`]: environment-driven runtime settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notably_ai::{AiOperations, StaticIdentity};
//! use notably_core::ErrorMonitor;
//!
//! let ops = AiOperations::new(
//!     Arc::new(StaticIdentity::signed_in("user-1")),
//!     Arc::new(store),
//!     Arc::new(backend),
//!     Arc::new(ErrorMonitor::new()),
//! );
//! let result = ops.generate_both("note-123").await;
//! if result.is_partial() {
//!     // keep result.partial_data, offer a retry
//! }
//! ```

pub mod backup;
pub mod config;
pub mod identity;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod rollback;
pub mod tags;

pub use backup::{BackupStore, Clock, ManualClock, SystemClock};
pub use config::AiConfig;
pub use identity::StaticIdentity;
pub use orchestrator::{
    actions, combine_results, validate_manual_summary, validate_manual_tags, AiOperations,
};
pub use retry::{RetryHandle, RetryObserver, RetryPolicy, RetryState};
pub use rollback::{generate_both_with_backup, restore_from_backup, RestoreOutcome};
pub use tags::parse_tags;
