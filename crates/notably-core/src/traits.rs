//! Core traits for the collaborators of the AI processing layer.
//!
//! These traits define the interfaces that concrete implementations
//! (PostgreSQL store, Ollama backend, session-based identity) provide.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CurrentUser, Note};

// =============================================================================
// IDENTITY
// =============================================================================

/// Source of the authenticated caller for the current request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Return the caller, `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<CurrentUser>>;
}

// =============================================================================
// STORAGE
// =============================================================================

/// Note storage as needed by AI processing.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Load a note only if it belongs to `owner_id`.
    ///
    /// Returns `None` both when the note does not exist and when it belongs
    /// to someone else.
    async fn find_note_by_id_for_owner(&self, owner_id: &str, note_id: &str)
        -> Result<Option<Note>>;

    /// Insert or replace the summary of a note.
    async fn upsert_summary(&self, note_id: &str, model: &str, content: &str) -> Result<()>;

    /// Replace all tags of a note with `tags`.
    async fn replace_tags(&self, note_id: &str, tags: &[String]) -> Result<()>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt. One call, no streaming.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
