//! Pre-operation snapshots of a note's AI-derived fields.
//!
//! The store is an explicit, mutex-guarded map injected where it is needed.
//! Entries older than the TTL are swept lazily on every create and dropped
//! on read. Nothing here fails: a missing or expired backup is reported as
//! `None` / `false` and the caller decides what to tell the user.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use notably_core::defaults::BACKUP_TTL_SECS;
use notably_core::{BackupData, BackupKind, DataBackup};

/// Time source, injectable for expiry tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

pub struct BackupStore {
    entries: Mutex<HashMap<String, DataBackup>>,
    /// Last id issued per `{note_id}_{kind}`: (millis, suffix). Outlives the
    /// backups themselves so a cleared id is never handed out again.
    issued: Mutex<HashMap<String, (i64, u32)>>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            issued: Mutex::new(HashMap::new()),
            clock,
            ttl: chrono::Duration::seconds(BACKUP_TTL_SECS),
        }
    }

    /// Snapshot `data` for `note_id` and return the new backup id.
    ///
    /// Ids are `{note_id}_{kind}_{epoch_millis}`; a later backup of the
    /// same note and kind within the same millisecond gets a `-{n}` suffix.
    /// No id is issued twice in the lifetime of the store, even after the
    /// earlier backup was cleared or the clock stepped backwards.
    pub fn create_backup(&self, note_id: &str, data: &BackupData, kind: BackupKind) -> String {
        let now = self.clock.now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);

        let id = self.next_id(note_id, kind, now.timestamp_millis());

        entries.insert(
            id.clone(),
            DataBackup {
                id: id.clone(),
                timestamp: now,
                data: data.clone(),
                kind,
            },
        );
        debug!(
            subsystem = "ai",
            component = "backup",
            op = "create",
            note_id,
            backup_id = %id,
            kind = %kind,
            "Backup created"
        );
        id
    }

    /// Look up a backup; expired entries are removed and reported absent.
    pub fn get_backup(&self, backup_id: &str) -> Option<DataBackup> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = entries
            .get(backup_id)
            .map(|b| self.is_expired(b, now))?;
        if expired {
            entries.remove(backup_id);
            debug!(
                subsystem = "ai",
                component = "backup",
                backup_id,
                "Backup expired"
            );
            return None;
        }
        entries.get(backup_id).cloned()
    }

    /// Whether a live backup exists. Applying its data is up to the caller.
    pub fn restore_backup(&self, backup_id: &str) -> bool {
        self.get_backup(backup_id).is_some()
    }

    /// Remove a backup; absent ids are ignored.
    pub fn clear_backup(&self, backup_id: &str) {
        if self.lock().remove(backup_id).is_some() {
            trace!(subsystem = "ai", component = "backup", backup_id, "Backup cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot summary and tags before a combined AI run.
    pub fn backup_before_ai_processing(
        &self,
        note_id: &str,
        summary: Option<&str>,
        tags: &[String],
    ) -> String {
        let data = BackupData {
            summary: summary.map(str::to_string),
            tags: tags.to_vec(),
        };
        self.create_backup(note_id, &data, BackupKind::Both)
    }

    /// Hand the backed-up fields to the setters that match the backup kind,
    /// then drop the backup. Returns `false` when nothing could be restored.
    pub fn rollback_on_failure(
        &self,
        backup_id: &str,
        apply_summary: impl FnOnce(Option<String>),
        apply_tags: impl FnOnce(Vec<String>),
    ) -> bool {
        let Some(backup) = self.get_backup(backup_id) else {
            info!(
                subsystem = "ai",
                component = "backup",
                op = "rollback",
                backup_id,
                "No backup available for rollback"
            );
            return false;
        };

        match backup.kind {
            BackupKind::Summary => apply_summary(backup.data.summary),
            BackupKind::Tags => apply_tags(backup.data.tags),
            BackupKind::Both => {
                apply_summary(backup.data.summary);
                apply_tags(backup.data.tags);
            }
        }
        self.clear_backup(backup_id);
        info!(
            subsystem = "ai",
            component = "backup",
            op = "rollback",
            backup_id,
            "Rolled back to backup"
        );
        true
    }

    fn next_id(&self, note_id: &str, kind: BackupKind, millis: i64) -> String {
        let key = format!("{}_{}", note_id, kind);
        let mut issued = self.issued.lock().unwrap_or_else(|p| p.into_inner());
        let (millis, seq) = match issued.get(&key) {
            Some(&(last, seq)) if millis <= last => (last, seq + 1),
            _ => (millis, 0),
        };
        issued.insert(key.clone(), (millis, seq));
        if seq == 0 {
            format!("{}_{}", key, millis)
        } else {
            format!("{}_{}-{}", key, millis, seq)
        }
    }

    fn is_expired(&self, backup: &DataBackup, now: DateTime<Utc>) -> bool {
        now - backup.timestamp > self.ttl
    }

    fn sweep(&self, entries: &mut HashMap<String, DataBackup>, now: DateTime<Utc>) {
        entries.retain(|id, backup| {
            let keep = !self.is_expired(backup, now);
            if !keep {
                trace!(subsystem = "ai", component = "backup", backup_id = %id, "Sweeping expired backup");
            }
            keep
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DataBackup>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap(),
        ))
    }

    fn data() -> BackupData {
        BackupData {
            summary: Some("- old summary".to_string()),
            tags: vec!["rust".to_string(), "notes".to_string()],
        }
    }

    #[test]
    fn test_id_format() {
        let clock = clock();
        let store = BackupStore::with_clock(clock.clone());
        let id = store.create_backup("note-123", &data(), BackupKind::Summary);
        let millis = clock.now().timestamp_millis();
        assert_eq!(id, format!("note-123_summary_{}", millis));
    }

    #[test]
    fn test_round_trip_is_deep_copy() {
        let store = BackupStore::new();
        let mut original = data();
        let id = store.create_backup("note-1", &original, BackupKind::Both);

        original.tags.push("mutated".to_string());
        original.summary = None;

        let backup = store.get_backup(&id).unwrap();
        assert_eq!(backup.data, data());
        assert_eq!(backup.kind, BackupKind::Both);
        assert_eq!(backup.id, id);
    }

    #[test]
    fn test_same_millisecond_ids_do_not_collide() {
        let store = BackupStore::with_clock(clock());
        let a = store.create_backup("note-1", &data(), BackupKind::Tags);
        let b = store.create_backup("note-1", &data(), BackupKind::Tags);
        let c = store.create_backup("note-1", &data(), BackupKind::Tags);
        assert_ne!(a, b);
        assert_eq!(b, format!("{}-1", a));
        assert_eq!(c, format!("{}-2", a));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_cleared_id_is_not_reissued() {
        let store = BackupStore::with_clock(clock());
        let a = store.create_backup("note-1", &data(), BackupKind::Summary);
        store.clear_backup(&a);
        let b = store.create_backup("note-1", &data(), BackupKind::Summary);
        assert_ne!(a, b);
        assert_eq!(b, format!("{}-1", a));

        let mut summary = None;
        assert!(store.rollback_on_failure(&b, |s| summary = s, |_| {}));
        let c = store.create_backup("note-1", &data(), BackupKind::Summary);
        assert_eq!(c, format!("{}-2", a));
        assert!(store.get_backup(&a).is_none());
        assert!(store.get_backup(&b).is_none());
    }

    #[test]
    fn test_ids_stay_unique_when_clock_steps_back() {
        let clock = clock();
        let store = BackupStore::with_clock(clock.clone());
        let a = store.create_backup("note-1", &data(), BackupKind::Tags);
        clock.advance(chrono::Duration::milliseconds(-5));
        let b = store.create_backup("note-1", &data(), BackupKind::Tags);
        assert_eq!(b, format!("{}-1", a));
    }

    #[test]
    fn test_new_millisecond_restarts_suffix() {
        let clock = clock();
        let store = BackupStore::with_clock(clock.clone());
        store.create_backup("note-1", &data(), BackupKind::Tags);
        store.create_backup("note-1", &data(), BackupKind::Tags);
        clock.advance(chrono::Duration::milliseconds(1));
        let c = store.create_backup("note-1", &data(), BackupKind::Tags);
        assert_eq!(c, format!("note-1_tags_{}", clock.now().timestamp_millis()));
    }

    #[test]
    fn test_different_notes_never_share_ids() {
        let store = BackupStore::with_clock(clock());
        let a = store.create_backup("note-1", &data(), BackupKind::Both);
        let b = store.create_backup("note-2", &data(), BackupKind::Both);
        assert_ne!(a, b);
        assert!(store.get_backup(&a).is_some());
        assert!(store.get_backup(&b).is_some());
    }

    #[test]
    fn test_expired_backup_is_absent_and_removed() {
        let clock = clock();
        let store = BackupStore::with_clock(clock.clone());
        let id = store.create_backup("note-1", &data(), BackupKind::Summary);

        clock.advance(chrono::Duration::minutes(59));
        assert!(store.restore_backup(&id));

        clock.advance(chrono::Duration::minutes(2));
        assert!(store.get_backup(&id).is_none());
        assert!(store.is_empty());
        assert!(!store.restore_backup(&id));
    }

    #[test]
    fn test_create_sweeps_expired_entries() {
        let clock = clock();
        let store = BackupStore::with_clock(clock.clone());
        store.create_backup("note-1", &data(), BackupKind::Summary);
        clock.advance(chrono::Duration::hours(2));
        let fresh = store.create_backup("note-2", &data(), BackupKind::Tags);
        assert_eq!(store.len(), 1);
        assert!(store.get_backup(&fresh).is_some());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = BackupStore::new();
        let id = store.create_backup("note-1", &data(), BackupKind::Tags);
        store.clear_backup(&id);
        store.clear_backup(&id);
        store.clear_backup("never-existed");
        assert!(store.get_backup(&id).is_none());
    }

    #[test]
    fn test_rollback_applies_both_fields() {
        let store = BackupStore::new();
        let tags = vec!["a".to_string()];
        let id = store.backup_before_ai_processing("note-1", Some("prev"), &tags);

        let mut summary = None;
        let mut restored_tags = Vec::new();
        let ok = store.rollback_on_failure(&id, |s| summary = s, |t| restored_tags = t);

        assert!(ok);
        assert_eq!(summary.as_deref(), Some("prev"));
        assert_eq!(restored_tags, tags);
        assert!(store.get_backup(&id).is_none());
    }

    #[test]
    fn test_rollback_respects_kind() {
        let store = BackupStore::new();
        let id = store.create_backup("note-1", &data(), BackupKind::Tags);

        let mut summary_called = false;
        let mut tags = Vec::new();
        assert!(store.rollback_on_failure(&id, |_| summary_called = true, |t| tags = t));
        assert!(!summary_called);
        assert_eq!(tags, data().tags);
    }

    #[test]
    fn test_rollback_missing_backup() {
        let store = BackupStore::new();
        let mut summary_called = false;
        let mut tags_called = false;
        let ok = store.rollback_on_failure(
            "missing",
            |_| summary_called = true,
            |_| tags_called = true,
        );
        assert!(!ok);
        assert!(!summary_called && !tags_called);
    }
}
