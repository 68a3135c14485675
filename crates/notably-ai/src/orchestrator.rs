//! AI summary and tag operations for notes.
//!
//! Every operation authenticates the caller, loads the note scoped to that
//! caller, checks the token budget, calls the model through a
//! [`RetryHandle`], parses the reply, and persists it. Failures are
//! classified once, where they first appear, and returned as structured
//! [`AiOperationResult`]s; nothing here returns a raw error to the caller.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notably_core::defaults::{
    AI_TOKEN_LIMIT, MANUAL_SUMMARY_MAX_LENGTH, MANUAL_SUMMARY_MODEL, MANUAL_TAG_LIMIT,
    MANUAL_TAG_MAX_LENGTH,
};
use notably_core::{
    estimate_tokens, AiOperationResult, AiOutput, ClassifiedError, Error, ErrorClassifier,
    ErrorKind, ErrorMonitor, GenerationBackend, IdentityProvider, ManualEditResult, Note,
    NoteStore, Result,
};

use crate::config::AiConfig;
use crate::prompts::{summary_prompt, tags_prompt, SYSTEM_PROMPT};
use crate::retry::{RetryHandle, RetryPolicy};
use crate::tags::parse_tags;

/// Classifier action names.
pub mod actions {
    pub const GENERATE_SUMMARY: &str = "generate_summary";
    pub const GENERATE_TAGS: &str = "generate_tags";
    pub const UPDATE_SUMMARY: &str = "update_summary";
    pub const UPDATE_TAGS: &str = "update_tags";
}

type Outcome<T> = std::result::Result<T, ClassifiedError>;

/// Server-side AI operations on notes.
pub struct AiOperations {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn NoteStore>,
    backend: Arc<dyn GenerationBackend>,
    classifier: ErrorClassifier,
    config: AiConfig,
    policy: RetryPolicy,
}

impl AiOperations {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn NoteStore>,
        backend: Arc<dyn GenerationBackend>,
        monitor: Arc<ErrorMonitor>,
    ) -> Self {
        Self {
            identity,
            store,
            backend,
            classifier: ErrorClassifier::new(monitor),
            config: AiConfig::default(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: AiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        self.classifier.monitor()
    }

    /// A fresh retry handle wired to the shared monitor.
    pub fn retry_handle(&self, action: &str) -> RetryHandle {
        RetryHandle::new(self.policy)
            .with_label(action)
            .with_observer(self.classifier.monitor().clone())
    }

    /// Generate, store, and return a bullet summary of the note.
    #[instrument(skip(self), fields(subsystem = "ai", component = "orchestrator", op = "generate_summary", operation_id = %Uuid::now_v7()))]
    pub async fn generate_summary(&self, note_id: &str) -> AiOperationResult {
        let retry = self.retry_handle(actions::GENERATE_SUMMARY);
        self.generate_summary_with(&retry, note_id).await
    }

    /// Like [`generate_summary`](Self::generate_summary), reporting progress
    /// through a caller-owned retry handle.
    pub async fn generate_summary_with(&self, retry: &RetryHandle, note_id: &str) -> AiOperationResult {
        let start = Instant::now();
        let result = match self.summarize(retry, note_id).await {
            Ok(summary) => AiOperationResult::ok(AiOutput::summary(summary)),
            Err(e) => AiOperationResult::failed(&e),
        };
        log_result(actions::GENERATE_SUMMARY, note_id, &result, start);
        result
    }

    /// Generate, store, and return up to six tags for the note.
    #[instrument(skip(self), fields(subsystem = "ai", component = "orchestrator", op = "generate_tags", operation_id = %Uuid::now_v7()))]
    pub async fn generate_tags(&self, note_id: &str) -> AiOperationResult {
        let retry = self.retry_handle(actions::GENERATE_TAGS);
        self.generate_tags_with(&retry, note_id).await
    }

    pub async fn generate_tags_with(&self, retry: &RetryHandle, note_id: &str) -> AiOperationResult {
        let start = Instant::now();
        let result = match self.extract_tags(retry, note_id).await {
            Ok(tags) => AiOperationResult::ok(AiOutput::tags(tags)),
            Err(e) => AiOperationResult::failed(&e),
        };
        log_result(actions::GENERATE_TAGS, note_id, &result, start);
        result
    }

    /// Run summary and tag generation concurrently and combine the outcomes.
    ///
    /// Retrying after a partial failure means calling this again; both
    /// halves run again.
    #[instrument(skip(self), fields(subsystem = "ai", component = "orchestrator", op = "generate_both", operation_id = %Uuid::now_v7()))]
    pub async fn generate_both(&self, note_id: &str) -> AiOperationResult {
        let start = Instant::now();
        let summary_retry = self.retry_handle(actions::GENERATE_SUMMARY);
        let tags_retry = self.retry_handle(actions::GENERATE_TAGS);

        let (summary, tags) = futures::future::join(
            self.summarize(&summary_retry, note_id),
            self.extract_tags(&tags_retry, note_id),
        )
        .await;

        let result = combine_results(summary, tags);
        if result.is_partial() {
            warn!(
                note_id,
                partial_success = true,
                has_summary = result.partial_data.as_ref().is_some_and(|d| d.summary.is_some()),
                has_tags = result.partial_data.as_ref().is_some_and(|d| d.tags.is_some()),
                duration_ms = start.elapsed().as_millis() as u64,
                "Combined AI processing partially failed"
            );
        } else {
            log_result("generate_both", note_id, &result, start);
        }
        result
    }

    /// Store a hand-written summary.
    #[instrument(skip(self, content), fields(subsystem = "ai", component = "orchestrator", op = "update_summary"))]
    pub async fn update_summary(&self, note_id: &str, content: &str) -> ManualEditResult {
        match self.apply_manual_summary(note_id, content).await {
            Ok(summary) => {
                info!(note_id, "Manual summary saved");
                ManualEditResult::ok(AiOutput::summary(summary))
            }
            Err(e) => ManualEditResult::failed(&e),
        }
    }

    /// Replace the note's tags with a hand-written list.
    #[instrument(skip(self, tags), fields(subsystem = "ai", component = "orchestrator", op = "update_tags", tag_count = tags.len()))]
    pub async fn update_tags(&self, note_id: &str, tags: &[String]) -> ManualEditResult {
        match self.apply_manual_tags(note_id, tags).await {
            Ok(tags) => {
                info!(note_id, tag_count = tags.len(), "Manual tags saved");
                ManualEditResult::ok(AiOutput::tags(tags))
            }
            Err(e) => ManualEditResult::failed(&e),
        }
    }

    async fn summarize(&self, retry: &RetryHandle, note_id: &str) -> Outcome<String> {
        let action = actions::GENERATE_SUMMARY;
        let note = self.load_owned_note(note_id, action).await?;
        self.check_token_budget(&note, action)?;

        let summary = self.generate_with_retry(retry, &summary_prompt(&note), action).await?;
        if summary.trim().is_empty() {
            return Err(self.classifier.classify(
                &Error::Parsing("AI returned no output for the summary".to_string()),
                action,
            ));
        }

        self.store
            .upsert_summary(&note.id, self.summary_model_label(), &summary)
            .await
            .map_err(|e| self.storage_failed(e, action))?;
        Ok(summary)
    }

    async fn extract_tags(&self, retry: &RetryHandle, note_id: &str) -> Outcome<Vec<String>> {
        let action = actions::GENERATE_TAGS;
        let note = self.load_owned_note(note_id, action).await?;
        self.check_token_budget(&note, action)?;

        let response = self.generate_with_retry(retry, &tags_prompt(&note), action).await?;
        let tags = parse_tags(&response);
        if tags.is_empty() {
            let reason = if response.trim().is_empty() {
                "AI returned no output for tags"
            } else {
                "AI response contained no usable tags"
            };
            return Err(self
                .classifier
                .classify(&Error::Parsing(reason.to_string()), action));
        }
        debug!(note_id, tag_count = tags.len(), "Parsed tags");

        self.store
            .replace_tags(&note.id, &tags)
            .await
            .map_err(|e| self.storage_failed(e, action))?;
        Ok(tags)
    }

    async fn apply_manual_summary(&self, note_id: &str, content: &str) -> Outcome<String> {
        let action = actions::UPDATE_SUMMARY;
        let note = self.load_owned_note(note_id, action).await?;
        let summary =
            validate_manual_summary(content).map_err(|e| self.classifier.classify(&e, action))?;
        self.store
            .upsert_summary(&note.id, MANUAL_SUMMARY_MODEL, &summary)
            .await
            .map_err(|e| self.storage_failed(e, action))?;
        Ok(summary)
    }

    async fn apply_manual_tags(&self, note_id: &str, tags: &[String]) -> Outcome<Vec<String>> {
        let action = actions::UPDATE_TAGS;
        let note = self.load_owned_note(note_id, action).await?;
        let tags = validate_manual_tags(tags).map_err(|e| self.classifier.classify(&e, action))?;
        self.store
            .replace_tags(&note.id, &tags)
            .await
            .map_err(|e| self.storage_failed(e, action))?;
        Ok(tags)
    }

    /// Resolve the caller and load the note only if the caller owns it.
    async fn load_owned_note(&self, note_id: &str, action: &str) -> Outcome<Note> {
        let user = match self.identity.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(self.classifier.classify(
                    &Error::Unauthorized("no signed-in user".to_string()),
                    action,
                ))
            }
            Err(e) => {
                return Err(self.classifier.classify_as(
                    ErrorKind::Authentication,
                    e.to_string(),
                    action,
                ))
            }
        };

        match self.store.find_note_by_id_for_owner(&user.id, note_id).await {
            Ok(Some(note)) => Ok(note),
            // Missing and foreign notes look the same to the caller.
            Ok(None) => Err(self.classifier.classify(
                &Error::Forbidden(format!("note {} not found for caller", note_id)),
                action,
            )),
            Err(e) => Err(self.storage_failed(e, action)),
        }
    }

    fn check_token_budget(&self, note: &Note, action: &str) -> Outcome<()> {
        let estimated = estimate_tokens(&note.ai_input());
        if estimated > AI_TOKEN_LIMIT {
            warn!(
                note_id = %note.id,
                estimated_tokens = estimated,
                limit = AI_TOKEN_LIMIT,
                "Note exceeds token budget, skipping AI call"
            );
            return Err(self.classifier.classify(
                &Error::TokenLimitExceeded {
                    estimated,
                    limit: AI_TOKEN_LIMIT,
                },
                action,
            ));
        }
        debug!(note_id = %note.id, estimated_tokens = estimated, "Token budget ok");
        Ok(())
    }

    async fn generate_with_retry(
        &self,
        retry: &RetryHandle,
        prompt: &str,
        action: &str,
    ) -> Outcome<String> {
        retry
            .execute_when(
                |e: &ClassifiedError| e.retryable(),
                || self.attempt(prompt, action),
            )
            .await
    }

    /// One external call, bounded by the per-attempt timeout.
    async fn attempt(&self, prompt: &str, action: &str) -> Outcome<String> {
        let start = Instant::now();
        let call = self.backend.generate_with_system(SYSTEM_PROMPT, prompt);
        let result = match self.config.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(Error::Timeout(format!(
                    "no response from model within {}s",
                    limit.as_secs()
                )))
            }),
            None => call.await,
        };

        match result {
            Ok(text) => {
                debug!(
                    model = self.backend.model_name(),
                    prompt_len = prompt.len(),
                    response_len = text.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Model responded"
                );
                Ok(text)
            }
            Err(e) => Err(self.classifier.classify(&e, action)),
        }
    }

    fn storage_failed(&self, error: Error, action: &str) -> ClassifiedError {
        self.classifier
            .classify_as(ErrorKind::Database, error.to_string(), action)
    }

    fn summary_model_label(&self) -> &str {
        self.config
            .summary_model_label
            .as_deref()
            .unwrap_or_else(|| self.backend.model_name())
    }
}

/// Combine the two halves of a combined run.
///
/// Exactly one success yields a partial result carrying only that half;
/// two failures report the summary-side error.
pub fn combine_results(
    summary: Outcome<String>,
    tags: Outcome<Vec<String>>,
) -> AiOperationResult {
    match (summary, tags) {
        (Ok(summary), Ok(tags)) => AiOperationResult::ok(AiOutput {
            summary: Some(summary),
            tags: Some(tags),
        }),
        (Ok(summary), Err(_)) => AiOperationResult::partial(AiOutput::summary(summary)),
        (Err(_), Ok(tags)) => AiOperationResult::partial(AiOutput::tags(tags)),
        (Err(summary_error), Err(_)) => AiOperationResult::failed(&summary_error),
    }
}

/// Trim and length-check a hand-written summary.
pub fn validate_manual_summary(content: &str) -> Result<String> {
    let summary = content.trim();
    if summary.is_empty() {
        return Err(Error::InvalidInput("summary must not be empty".to_string()));
    }
    if summary.chars().count() > MANUAL_SUMMARY_MAX_LENGTH {
        return Err(Error::InvalidInput(format!(
            "summary must be at most {} characters",
            MANUAL_SUMMARY_MAX_LENGTH
        )));
    }
    Ok(summary.to_string())
}

/// Trim and check a hand-written tag list.
pub fn validate_manual_tags(tags: &[String]) -> Result<Vec<String>> {
    if tags.is_empty() {
        return Err(Error::InvalidInput("at least one tag is required".to_string()));
    }
    if tags.len() > MANUAL_TAG_LIMIT {
        return Err(Error::InvalidInput(format!(
            "at most {} tags are allowed",
            MANUAL_TAG_LIMIT
        )));
    }
    tags.iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() {
                Err(Error::InvalidInput("tags must not be empty".to_string()))
            } else if tag.chars().count() > MANUAL_TAG_MAX_LENGTH {
                Err(Error::InvalidInput(format!(
                    "tag '{}' must be at most {} characters",
                    tag, MANUAL_TAG_MAX_LENGTH
                )))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect()
}

fn log_result(op: &str, note_id: &str, result: &AiOperationResult, start: Instant) {
    let duration_ms = start.elapsed().as_millis() as u64;
    if result.success {
        info!(op, note_id, success = true, duration_ms, "AI operation complete");
    } else {
        warn!(
            op,
            note_id,
            success = false,
            error_kind = result.error_kind.map(|k| k.as_str()).unwrap_or(""),
            retryable = result.retryable.unwrap_or(false),
            duration_ms,
            "AI operation failed"
        );
    }
}
