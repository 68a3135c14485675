//! # notably-inference
//!
//! Text-generation backends for notably's AI processing.
//!
//! This crate provides:
//! - Ollama implementation of [`GenerationBackend`] (default)
//! - Mapping of provider HTTP failures onto classifiable errors
//! - Scripted mock backend (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Enable [`mock::MockGenerationBackend`] for downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use notably_inference::OllamaBackend;
//! use notably_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let summary = backend.generate("Summarize: hello").await.unwrap();
//!     println!("{}", summary);
//! }
//! ```

pub mod error;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use notably_core::{Error, GenerationBackend, Result};

pub use error::{to_notably_error, ProviderErrorCode};

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockGenerationBackend, MockReply};
