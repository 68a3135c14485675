//! Combined AI processing guarded by a backup of the note's current fields.
//!
//! The backup is taken before [`AiOperations::generate_both`] runs. On
//! success or partial success it is discarded; on total failure only the
//! fields that no longer match the backup are written back, under the model
//! label the summary had before the run.

use tracing::{debug, info, warn};

use notably_core::{AiOperationResult, BackupKind, NoteStore};

use crate::backup::BackupStore;
use crate::orchestrator::AiOperations;

/// Label for a restored summary whose original label is unknown.
const RESTORED_SUMMARY_MODEL: &str = "restored";

/// What [`restore_from_backup`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The stored note already matched the backup; nothing was written.
    Unchanged,
    /// At least one field was written back.
    Restored,
    /// The backup was missing or expired.
    NoBackup,
    /// Loading or writing the note failed. The backup is kept until it expires.
    Failed,
}

/// Run [`AiOperations::generate_both`] behind a backup of the note.
///
/// The operation result is returned unchanged; restore problems are logged.
pub async fn generate_both_with_backup(
    ops: &AiOperations,
    store: &dyn NoteStore,
    backups: &BackupStore,
    owner_id: &str,
    note_id: &str,
) -> AiOperationResult {
    let snapshot = match store.find_note_by_id_for_owner(owner_id, note_id).await {
        Ok(note) => note,
        Err(e) => {
            warn!(
                subsystem = "ai",
                component = "rollback",
                note_id,
                error = %e,
                "Could not snapshot note, running without backup"
            );
            None
        }
    };
    let backup = snapshot.map(|note| {
        let id = backups.backup_before_ai_processing(&note.id, note.summary.as_deref(), &note.tags);
        (id, note.summary_model)
    });

    let result = ops.generate_both(note_id).await;

    let Some((backup_id, summary_model)) = backup else {
        return result;
    };
    if result.success || result.is_partial() {
        backups.clear_backup(&backup_id);
    } else {
        let outcome = restore_from_backup(
            store,
            backups,
            &backup_id,
            owner_id,
            note_id,
            summary_model.as_deref(),
        )
        .await;
        debug!(
            subsystem = "ai",
            component = "rollback",
            note_id,
            backup_id = %backup_id,
            outcome = ?outcome,
            "Rollback finished"
        );
    }
    result
}

/// Write the backed-up fields back where the stored note differs from them.
///
/// A summary restored this way is stored under `summary_model`. A summary
/// that did not exist at backup time is left in place, since the store has
/// no way to remove one. The backup is cleared once the note matches it.
pub async fn restore_from_backup(
    store: &dyn NoteStore,
    backups: &BackupStore,
    backup_id: &str,
    owner_id: &str,
    note_id: &str,
    summary_model: Option<&str>,
) -> RestoreOutcome {
    let Some(backup) = backups.get_backup(backup_id) else {
        info!(
            subsystem = "ai",
            component = "rollback",
            note_id,
            backup_id,
            "No backup available for rollback"
        );
        return RestoreOutcome::NoBackup;
    };

    let current = match store.find_note_by_id_for_owner(owner_id, note_id).await {
        Ok(Some(note)) => note,
        Ok(None) => {
            warn!(subsystem = "ai", component = "rollback", note_id, "Note gone before rollback");
            return RestoreOutcome::Failed;
        }
        Err(e) => {
            warn!(
                subsystem = "ai",
                component = "rollback",
                note_id,
                error = %e,
                "Failed to load note for rollback"
            );
            return RestoreOutcome::Failed;
        }
    };

    let mut wrote = false;

    if matches!(backup.kind, BackupKind::Summary | BackupKind::Both) {
        match backup.data.summary.as_deref() {
            Some(previous) if current.summary.as_deref() != Some(previous) => {
                let model = summary_model.unwrap_or(RESTORED_SUMMARY_MODEL);
                if let Err(e) = store.upsert_summary(note_id, model, previous).await {
                    warn!(
                        subsystem = "ai",
                        component = "rollback",
                        note_id,
                        error = %e,
                        "Failed to restore summary"
                    );
                    return RestoreOutcome::Failed;
                }
                wrote = true;
            }
            None if current.summary.is_some() => {
                debug!(note_id, "Summary added after backup, leaving it in place");
            }
            _ => {}
        }
    }

    if matches!(backup.kind, BackupKind::Tags | BackupKind::Both)
        && current.tags != backup.data.tags
    {
        if let Err(e) = store.replace_tags(note_id, &backup.data.tags).await {
            warn!(
                subsystem = "ai",
                component = "rollback",
                note_id,
                error = %e,
                "Failed to restore tags"
            );
            return RestoreOutcome::Failed;
        }
        wrote = true;
    }

    backups.clear_backup(backup_id);
    if wrote {
        info!(
            subsystem = "ai",
            component = "rollback",
            note_id,
            backup_id,
            "Restored note after failed AI processing"
        );
        RestoreOutcome::Restored
    } else {
        debug!(note_id, backup_id, "Note unchanged, nothing to restore");
        RestoreOutcome::Unchanged
    }
}
