//! Data models for notes, backups, and AI operation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{ClassifiedError, ErrorKind};

// =============================================================================
// NOTES
// =============================================================================

/// Authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A note as loaded for AI processing, scoped to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    /// Current stored summary, if any.
    #[serde(default)]
    pub summary: Option<String>,
    /// Model label stored with the summary (`manual` for hand edits).
    #[serde(default)]
    pub summary_model: Option<String>,
    /// Current stored tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            content: content.into(),
            summary: None,
            summary_model: None,
            tags: Vec::new(),
        }
    }

    pub fn with_summary(mut self, model: impl Into<String>, summary: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self.summary = Some(summary.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Text that is sent to the model and counted against the token budget.
    pub fn ai_input(&self) -> String {
        format!("{}{}", self.title, self.content)
    }
}

// =============================================================================
// BACKUPS
// =============================================================================

/// Which part of a note a backup protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Summary,
    Tags,
    Both,
}

impl BackupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Summary => "summary",
            BackupKind::Tags => "tags",
            BackupKind::Both => "both",
        }
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot payload of a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupData {
    pub summary: Option<String>,
    pub tags: Vec<String>,
}

/// A pre-operation snapshot, keyed by `{note_id}_{kind}_{epoch_millis}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBackup {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub data: BackupData,
    pub kind: BackupKind,
}

// =============================================================================
// AI OPERATION RESULTS
// =============================================================================

/// Payload of an AI operation. Absent halves are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl AiOutput {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            tags: None,
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            summary: None,
            tags: Some(tags),
        }
    }
}

/// Error text of a combined operation where exactly one half failed.
pub const PARTIAL_ERROR_MESSAGE: &str = "AI processing had partial errors";

/// Structured outcome of an AI operation, as consumed by the presentation layer.
///
/// Only the combined operation sets `partial_success` / `partial_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiOperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AiOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_data: Option<AiOutput>,
}

impl AiOperationResult {
    pub fn ok(data: AiOutput) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// Failure carrying the user-facing message, kind, and retryability.
    pub fn failed(error: &ClassifiedError) -> Self {
        Self {
            success: false,
            error: Some(error.user_message().to_string()),
            error_kind: Some(error.kind()),
            retryable: Some(error.retryable()),
            ..Default::default()
        }
    }

    /// One half of a combined operation succeeded; `partial_data` holds it.
    pub fn partial(partial_data: AiOutput) -> Self {
        Self {
            success: false,
            error: Some(PARTIAL_ERROR_MESSAGE.to_string()),
            retryable: Some(true),
            partial_success: Some(true),
            partial_data: Some(partial_data),
            ..Default::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        self.partial_success == Some(true)
    }
}

/// Outcome of a manual (non-AI) edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEditResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AiOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManualEditResult {
    pub fn ok(data: AiOutput) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: &ClassifiedError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.user_message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_output_omits_absent_halves() {
        let json = serde_json::to_value(AiOutput::summary("- point")).unwrap();
        assert_eq!(json, serde_json::json!({ "summary": "- point" }));

        let json = serde_json::to_value(AiOutput::tags(vec!["rust".into()])).unwrap();
        assert_eq!(json, serde_json::json!({ "tags": ["rust"] }));
    }

    #[test]
    fn failed_result_uses_user_message() {
        let classified = ClassifiedError::new(ErrorKind::Network, "ECONNRESET 10.0.0.2");
        let result = AiOperationResult::failed(&classified);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(ErrorKind::Network.user_message()));
        assert_eq!(result.error_kind, Some(ErrorKind::Network));
        assert_eq!(result.retryable, Some(true));
        assert!(!result.is_partial());
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = AiOperationResult::partial(AiOutput::tags(vec!["a".into()]));
        assert!(result.is_partial());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["partialSuccess"], true);
        assert_eq!(json["partialData"], serde_json::json!({ "tags": ["a"] }));
        assert!(json.get("data").is_none());
        assert!(json.get("errorKind").is_none());
        assert_eq!(json["error"], PARTIAL_ERROR_MESSAGE);
    }

    #[test]
    fn backup_kind_names() {
        assert_eq!(BackupKind::Summary.to_string(), "summary");
        assert_eq!(BackupKind::Tags.to_string(), "tags");
        assert_eq!(BackupKind::Both.to_string(), "both");
    }

    #[test]
    fn note_ai_input_joins_title_and_content() {
        let note = Note::new("n", "u", "Title", "Body");
        assert_eq!(note.ai_input(), "TitleBody");
    }
}
