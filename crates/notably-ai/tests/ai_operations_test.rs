//! AI operation tests against the scripted mock backend and in-memory store.
//!
//! Backoff sleeps run on tokio's paused clock, so retries finish instantly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notably_ai::{AiConfig, AiOperations, RetryState, StaticIdentity};
use notably_core::{
    CurrentUser, Error, ErrorKind, ErrorMonitor, IdentityProvider, Note, Result,
};
use notably_db::InMemoryNoteStore;
use notably_inference::mock::{MockGenerationBackend, MockReply};

const SUMMARY_MARKER: &str = "Summarize";
const TAGS_MARKER: &str = "comma-separated tags";

struct Harness {
    ops: AiOperations,
    store: Arc<InMemoryNoteStore>,
    backend: MockGenerationBackend,
    monitor: Arc<ErrorMonitor>,
}

fn note_123() -> Note {
    Note::new(
        "note-123",
        "user-1",
        "Rust ownership",
        "Each value has a single owner; borrowing lets code read without taking ownership.",
    )
}

fn harness_with(
    identity: Arc<dyn IdentityProvider>,
    note: Note,
    backend: MockGenerationBackend,
) -> Harness {
    let store = Arc::new(InMemoryNoteStore::new().with_note(note));
    let monitor = Arc::new(ErrorMonitor::new());
    let ops = AiOperations::new(identity, store.clone(), Arc::new(backend.clone()), monitor.clone());
    Harness {
        ops,
        store,
        backend,
        monitor,
    }
}

fn harness(backend: MockGenerationBackend) -> Harness {
    harness_with(
        Arc::new(StaticIdentity::signed_in("user-1")),
        note_123(),
        backend,
    )
}

fn failures(n: usize, reply: fn(String) -> MockReply) -> Vec<MockReply> {
    (0..n).map(|i| reply(format!("attempt {} failed", i))).collect()
}

struct BrokenIdentity;

#[async_trait]
impl IdentityProvider for BrokenIdentity {
    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        Err(Error::Internal("session store unreachable".to_string()))
    }
}

// =============================================================================
// SINGLE OPERATIONS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_summary_succeeds_after_two_failures() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("- Values have one owner\n- Borrowing avoids moves")
        .failing_times("", 2);
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert!(result.success, "expected success, got {:?}", result);
    assert_eq!(
        result.data.unwrap().summary.as_deref(),
        Some("- Values have one owner\n- Borrowing avoids moves")
    );
    assert_eq!(h.backend.generate_call_count(), 3);

    let stored = h.store.get("note-123").unwrap();
    assert_eq!(
        stored.summary.as_deref(),
        Some("- Values have one owner\n- Borrowing avoids moves")
    );
    assert_eq!(h.store.summary_model("note-123").as_deref(), Some("mock-gen"));

    // Two classified network failures, one retried sequence that succeeded.
    assert_eq!(h.monitor.count_for_kind(ErrorKind::Network), 2);
    assert_eq!(h.monitor.count_for_action("generate_summary"), 2);
    assert_eq!(h.monitor.snapshot().retried_successes, 1);
    assert!((h.monitor.retry_success_rate() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_summary_model_label_override() {
    let backend = MockGenerationBackend::new().with_fixed_response("- short");
    let store = Arc::new(InMemoryNoteStore::new().with_note(note_123()));
    let ops = AiOperations::new(
        Arc::new(StaticIdentity::signed_in("user-1")),
        store.clone(),
        Arc::new(backend),
        Arc::new(ErrorMonitor::new()),
    )
    .with_config(AiConfig::default().with_summary_model_label("gpt-oss:20b"));

    assert!(ops.generate_summary("note-123").await.success);
    assert_eq!(store.summary_model("note-123").as_deref(), Some("gpt-oss:20b"));
}

#[tokio::test(start_paused = true)]
async fn test_summary_exhausts_retries() {
    let backend = MockGenerationBackend::new()
        .with_script("", failures(5, MockReply::Api));
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Api));
    assert_eq!(result.retryable, Some(true));
    assert_eq!(result.error.as_deref(), Some(ErrorKind::Api.user_message()));
    assert_eq!(h.backend.generate_call_count(), 3);
    assert!(h.store.get("note-123").unwrap().summary.is_none());
    assert!(h.monitor.retry_success_rate() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_summary_returned_as_generated() {
    let backend = MockGenerationBackend::new().with_fixed_response("\n- first\n- second\n");
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(
        result.data.unwrap().summary.as_deref(),
        Some("\n- first\n- second\n")
    );
    assert_eq!(
        h.store.get("note-123").unwrap().summary.as_deref(),
        Some("\n- first\n- second\n")
    );
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_is_retried_as_network() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("- recovered")
        .with_script("", vec![MockReply::timeout("model did not answer")]);
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert!(result.success);
    assert_eq!(h.backend.generate_call_count(), 2);
    assert_eq!(h.monitor.count_for_kind(ErrorKind::Network), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_summary_is_parsing_error() {
    let backend = MockGenerationBackend::new().with_fixed_response("   \n");
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Parsing));
    assert_eq!(result.retryable, Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_tags_capped_at_six() {
    let backend = MockGenerationBackend::new().with_response_for(
        TAGS_MARKER,
        "AI, 자동화, 태그, 테스트, 개발, 프로그래밍, 코딩, 소프트웨어",
    );
    let h = harness(backend);

    let result = h.ops.generate_tags("note-123").await;

    assert!(result.success);
    let tags = result.data.unwrap().tags.unwrap();
    assert_eq!(tags.len(), 6);
    assert_eq!(tags, vec!["AI", "자동화", "태그", "테스트", "개발", "프로그래밍"]);
    assert_eq!(h.store.get("note-123").unwrap().tags, tags);
}

#[tokio::test(start_paused = true)]
async fn test_empty_tags_response_is_retryable_parsing_error() {
    let backend = MockGenerationBackend::new().with_response_for(TAGS_MARKER, "");
    let h = harness(backend);

    let result = h.ops.generate_tags("note-123").await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Parsing));
    assert_eq!(result.retryable, Some(true));
    assert!(h.store.get("note-123").unwrap().tags.is_empty());
}

// =============================================================================
// PRE-FLIGHT CHECKS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_token_limit_rejected_without_api_call() {
    let mut note = note_123();
    note.content = "한".repeat(5500);
    let h = harness_with(
        Arc::new(StaticIdentity::signed_in("user-1")),
        note,
        MockGenerationBackend::new(),
    );

    let summary = h.ops.generate_summary("note-123").await;
    let tags = h.ops.generate_tags("note-123").await;

    for result in [summary, tags] {
        assert_eq!(result.error_kind, Some(ErrorKind::TokenLimitExceeded));
        assert_eq!(result.retryable, Some(false));
    }
    assert_eq!(h.backend.generate_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_caller_is_authentication_error() {
    let h = harness_with(
        Arc::new(StaticIdentity::anonymous()),
        note_123(),
        MockGenerationBackend::new(),
    );

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Authentication));
    assert_eq!(result.retryable, Some(false));
    assert_eq!(
        result.error.as_deref(),
        Some("Login required, please sign in again.")
    );
    assert_eq!(h.backend.generate_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_identity_failure_is_authentication_error() {
    let h = harness_with(Arc::new(BrokenIdentity), note_123(), MockGenerationBackend::new());

    let result = h.ops.generate_tags("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Authentication));
}

#[tokio::test(start_paused = true)]
async fn test_foreign_and_missing_notes_look_the_same() {
    let h = harness_with(
        Arc::new(StaticIdentity::signed_in("someone-else")),
        note_123(),
        MockGenerationBackend::new(),
    );

    let foreign = h.ops.generate_summary("note-123").await;
    let missing = h.ops.generate_summary("note-404").await;

    assert_eq!(foreign.error_kind, Some(ErrorKind::Authorization));
    assert_eq!(foreign, missing);
    assert_eq!(h.backend.generate_call_count(), 0);
}

// =============================================================================
// FAILURE CLASSIFICATION AT THE BOUNDARY
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_is_database_error() {
    let h = harness(MockGenerationBackend::new().with_fixed_response("- ok"));
    h.store.fail_next_writes(1);

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Database));
    assert_eq!(result.retryable, Some(true));
    // The model answered; only saving failed.
    assert_eq!(h.backend.generate_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_read_failure_is_database_error() {
    let h = harness(MockGenerationBackend::new());
    h.store.fail_next_reads(1);

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Database));
}

#[tokio::test(start_paused = true)]
async fn test_upstream_context_rejection_is_not_retried() {
    let backend = MockGenerationBackend::new().with_script(
        "",
        vec![MockReply::api(
            "Context length exceeded, token input too long: 400 Bad Request",
        )],
    );
    let h = harness(backend);

    let result = h.ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::TokenLimitExceeded));
    assert_eq!(result.retryable, Some(false));
    assert_eq!(h.backend.generate_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_model_times_out_per_attempt() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("- late")
        .with_latency_ms(10_000);
    let store = Arc::new(InMemoryNoteStore::new().with_note(note_123()));
    let ops = AiOperations::new(
        Arc::new(StaticIdentity::signed_in("user-1")),
        store,
        Arc::new(backend.clone()),
        Arc::new(ErrorMonitor::new()),
    )
    .with_config(AiConfig::default().with_attempt_timeout(Some(Duration::from_secs(1))));

    let result = ops.generate_summary("note-123").await;

    assert_eq!(result.error_kind, Some(ErrorKind::Network));
    assert_eq!(result.retryable, Some(true));
    assert_eq!(backend.generate_call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_handle_state_is_observable() {
    let backend = MockGenerationBackend::new()
        .with_fixed_response("- ok")
        .failing_times("", 1);
    let h = harness(backend);
    let handle = h.ops.retry_handle("generate_summary");

    let result = h.ops.generate_summary_with(&handle, "note-123").await;
    assert!(result.success);
    assert_eq!(handle.state(), RetryState::initial(3));

    let backend = MockGenerationBackend::new().with_script("", failures(3, MockReply::Network));
    let h = harness(backend);
    let handle = h.ops.retry_handle("generate_summary");

    let result = h.ops.generate_summary_with(&handle, "note-123").await;
    assert!(!result.success);
    let state = handle.state();
    assert!(state.is_exhausted());
    assert_eq!(
        state.last_error.as_deref(),
        Some(ErrorKind::Network.user_message())
    );
}

// =============================================================================
// COMBINED OPERATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_both_succeed() {
    let backend = MockGenerationBackend::new()
        .with_response_for(SUMMARY_MARKER, "- point")
        .with_response_for(TAGS_MARKER, "rust, ownership");
    let h = harness(backend);

    let result = h.ops.generate_both("note-123").await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data.summary.as_deref(), Some("- point"));
    assert_eq!(data.tags, Some(vec!["rust".to_string(), "ownership".to_string()]));
    assert!(result.partial_success.is_none());
    assert_eq!(h.backend.calls_matching(SUMMARY_MARKER), 1);
    assert_eq!(h.backend.calls_matching(TAGS_MARKER), 1);
}

#[tokio::test(start_paused = true)]
async fn test_summary_succeeds_tags_fail() {
    let backend = MockGenerationBackend::new()
        .with_response_for(SUMMARY_MARKER, "- point")
        .with_script(TAGS_MARKER, failures(3, MockReply::Api));
    let h = harness(backend);

    let result = h.ops.generate_both("note-123").await;

    assert!(!result.success);
    assert!(result.is_partial());
    assert_eq!(result.error.as_deref(), Some("AI processing had partial errors"));
    assert_eq!(result.retryable, Some(true));
    assert!(result.data.is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["partialSuccess"], true);
    assert_eq!(json["partialData"], serde_json::json!({ "summary": "- point" }));

    let stored = h.store.get("note-123").unwrap();
    assert_eq!(stored.summary.as_deref(), Some("- point"));
    assert!(stored.tags.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tags_succeed_summary_fails() {
    let backend = MockGenerationBackend::new()
        .with_script(SUMMARY_MARKER, failures(3, MockReply::Network))
        .with_response_for(TAGS_MARKER, "rust, borrowing");
    let h = harness(backend);

    let result = h.ops.generate_both("note-123").await;

    assert!(!result.success);
    assert!(result.is_partial());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json["partialData"],
        serde_json::json!({ "tags": ["rust", "borrowing"] })
    );
    assert!(h.store.get("note-123").unwrap().summary.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_both_fail_reports_summary_error() {
    let backend = MockGenerationBackend::new()
        .with_script(SUMMARY_MARKER, failures(3, MockReply::Api))
        .with_script(TAGS_MARKER, failures(3, MockReply::Network));
    let h = harness(backend);

    let result = h.ops.generate_both("note-123").await;

    assert!(!result.success);
    assert!(result.partial_success.is_none());
    assert!(result.partial_data.is_none());
    assert_eq!(result.error_kind, Some(ErrorKind::Api));
    assert_eq!(h.backend.generate_call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_rerunning_both_after_partial_failure() {
    let backend = MockGenerationBackend::new()
        .with_response_for(SUMMARY_MARKER, "- point")
        .with_response_for(TAGS_MARKER, "rust")
        .with_script(TAGS_MARKER, failures(3, MockReply::Network));
    let h = harness(backend);

    let first = h.ops.generate_both("note-123").await;
    assert!(first.is_partial());

    let second = h.ops.generate_both("note-123").await;
    assert!(second.success);
    assert_eq!(h.backend.calls_matching(SUMMARY_MARKER), 2);
    assert_eq!(h.store.get("note-123").unwrap().tags, vec!["rust"]);
}

// =============================================================================
// MANUAL EDITS
// =============================================================================

#[tokio::test]
async fn test_manual_summary_saved_with_manual_model() {
    let h = harness(MockGenerationBackend::new());

    let result = h.ops.update_summary("note-123", "  My own summary  ").await;

    assert!(result.success);
    assert_eq!(result.data.unwrap().summary.as_deref(), Some("My own summary"));
    assert_eq!(h.store.summary_model("note-123").as_deref(), Some("manual"));
    assert_eq!(h.backend.generate_call_count(), 0);
}

#[tokio::test]
async fn test_manual_summary_too_long() {
    let h = harness(MockGenerationBackend::new());

    let result = h.ops.update_summary("note-123", &"a".repeat(2001)).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some(ErrorKind::Validation.user_message())
    );
    assert!(h.store.get("note-123").unwrap().summary.is_none());
}

#[tokio::test]
async fn test_manual_tags_saved() {
    let h = harness(MockGenerationBackend::new());
    let tags = vec!["rust".to_string(), " notes ".to_string()];

    let result = h.ops.update_tags("note-123", &tags).await;

    assert!(result.success);
    assert_eq!(h.store.get("note-123").unwrap().tags, vec!["rust", "notes"]);
}

#[tokio::test]
async fn test_manual_tags_validation() {
    let h = harness(MockGenerationBackend::new());

    let empty = h.ops.update_tags("note-123", &[]).await;
    let too_many: Vec<String> = (0..11).map(|i| format!("tag{}", i)).collect();
    let many = h.ops.update_tags("note-123", &too_many).await;
    let long = h.ops.update_tags("note-123", &["x".repeat(51)]).await;

    for result in [empty, many, long] {
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some(ErrorKind::Validation.user_message())
        );
    }
    assert_eq!(h.monitor.count_for_kind(ErrorKind::Validation), 3);
}

#[tokio::test]
async fn test_manual_edit_requires_ownership() {
    let h = harness_with(
        Arc::new(StaticIdentity::signed_in("someone-else")),
        note_123(),
        MockGenerationBackend::new(),
    );

    let result = h.ops.update_summary("note-123", "hijack").await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some(ErrorKind::Authorization.user_message())
    );
    assert!(h.store.get("note-123").unwrap().summary.is_none());
}
