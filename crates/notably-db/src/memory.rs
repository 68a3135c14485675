//! In-memory note store.
//!
//! Used by the process binary when no `DATABASE_URL` is configured and by
//! tests that need to inject storage failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use notably_core::{Error, Note, NoteStore, Result};

#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: Mutex<HashMap<String, Note>>,
    writes: AtomicUsize,
    failing_writes: AtomicUsize,
    failing_reads: AtomicUsize,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(self, note: Note) -> Self {
        self.insert(note);
        self
    }

    pub fn insert(&self, note: Note) {
        self.lock_notes().insert(note.id.clone(), note);
    }

    /// Snapshot of a stored note regardless of owner.
    pub fn get(&self, note_id: &str) -> Option<Note> {
        self.lock_notes().get(note_id).cloned()
    }

    pub fn summary_model(&self, note_id: &str) -> Option<String> {
        self.lock_notes()
            .get(note_id)
            .and_then(|n| n.summary_model.clone())
    }

    /// Number of summary and tag writes that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Fail the next `n` summary or tag writes with a storage error.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` note loads with a storage error.
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    fn lock_notes(&self) -> MutexGuard<'_, HashMap<String, Note>> {
        self.notes.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_write(&self) -> Result<()> {
        if Self::take_failure(&self.failing_writes) {
            return Err(Error::Storage("storage write failed: connection lost".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn find_note_by_id_for_owner(
        &self,
        owner_id: &str,
        note_id: &str,
    ) -> Result<Option<Note>> {
        if Self::take_failure(&self.failing_reads) {
            return Err(Error::Storage("storage read failed: connection lost".to_string()));
        }
        Ok(self
            .lock_notes()
            .get(note_id)
            .filter(|n| n.owner_id == owner_id)
            .cloned())
    }

    async fn upsert_summary(&self, note_id: &str, model: &str, content: &str) -> Result<()> {
        self.check_write()?;
        let mut notes = self.lock_notes();
        let note = notes
            .get_mut(note_id)
            .ok_or_else(|| Error::Storage(format!("no note row {}", note_id)))?;
        note.summary = Some(content.to_string());
        note.summary_model = Some(model.to_string());
        Ok(())
    }

    async fn replace_tags(&self, note_id: &str, tags: &[String]) -> Result<()> {
        self.check_write()?;
        let mut notes = self.lock_notes();
        let note = notes
            .get_mut(note_id)
            .ok_or_else(|| Error::Storage(format!("no note row {}", note_id)))?;
        note.tags = tags.to_vec();
        Ok(())
    }
}
