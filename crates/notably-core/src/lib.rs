//! # notably-core
//!
//! Core types, traits, and abstractions for the notably AI processing layer.
//!
//! This crate provides the foundational pieces the other notably crates
//! depend on: the error type, the nine-kind AI error taxonomy and its
//! classifier, the error monitor, the note/result models, and the traits for
//! the external collaborators (identity, note storage, text generation).

pub mod classify;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod tokenizer;
pub mod traits;

// Re-export commonly used types at crate root
pub use classify::{classify, classify_message, ClassifiedError, ErrorClassifier, ErrorKind};
pub use error::{Error, Result};
pub use models::*;
pub use monitor::{ErrorEntry, ErrorMonitor, MonitorSnapshot};
pub use tokenizer::{estimate_tokens, exceeds_token_limit};
pub use traits::*;
