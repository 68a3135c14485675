//! Structured logging schema and field name constants for notably.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query AI failures by kind, note, and attempt
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (classified failure, retry scheduled) |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (individual tags, sweep entries) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one orchestrator operation.
/// Format: UUIDv7 (time-ordered).
pub const OPERATION_ID: &str = "operation_id";

/// Subsystem originating the log event.
/// Values: "ai", "database", "inference", "monitor"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "orchestrator", "retry", "backup", "ollama", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "generate_summary", "generate_tags", "generate_both", "generate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note identifier being operated on.
pub const NOTE_ID: &str = "note_id";

/// Caller identifier.
pub const USER_ID: &str = "user_id";

/// Backup identifier.
pub const BACKUP_ID: &str = "backup_id";

// ─── Retry fields ──────────────────────────────────────────────────────────

/// 1-indexed attempt number.
pub const ATTEMPT: &str = "attempt";

/// Attempt cap for the current sequence.
pub const MAX_RETRIES: &str = "max_retries";

/// Backoff delay before the next attempt, in milliseconds.
pub const DELAY_MS: &str = "delay_ms";

// ─── Classification fields ─────────────────────────────────────────────────

/// Classified error kind (`NETWORK_ERROR`, ...).
pub const ERROR_KIND: &str = "error_kind";

/// Whether the classified error may be retried.
pub const RETRYABLE: &str = "retryable";

/// Calling action recorded with a classified error.
pub const ACTION: &str = "action";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

/// Estimated token count of a note.
pub const ESTIMATED_TOKENS: &str = "estimated_tokens";

/// Number of tags produced or stored.
pub const TAG_COUNT: &str = "tag_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Whether only one half of a combined operation succeeded.
pub const PARTIAL_SUCCESS: &str = "partial_success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
