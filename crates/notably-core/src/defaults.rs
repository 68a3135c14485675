//! Centralized default constants for notably.
//!
//! **This module is the single source of truth** for the fixed policies of
//! the AI processing layer. The retry policy and limits are tuned for one
//! external text-generation API and are not configurable per call site.

// =============================================================================
// RETRY
// =============================================================================

/// Maximum number of attempts for one AI call (first attempt included).
pub const AI_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff, in milliseconds.
/// Attempt `n` waits `AI_RETRY_BASE_DELAY_MS * 2^(n-1)` plus jitter.
pub const AI_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound (exclusive) of the random jitter added to each backoff delay.
pub const AI_RETRY_MAX_JITTER_MS: u64 = 1000;

// =============================================================================
// TOKEN BUDGET
// =============================================================================

/// Maximum estimated tokens for `title + content` before an AI call is refused.
pub const AI_TOKEN_LIMIT: usize = 8192;

/// Estimated tokens per character for Latin-script (and script-neutral) text.
pub const TOKENS_PER_LATIN_CHAR: f64 = 0.25;

/// Estimated tokens per character for non-Latin scripts (Hangul, Han, Cyrillic, ...).
pub const TOKENS_PER_NON_LATIN_CHAR: f64 = 1.5;

// =============================================================================
// TAGS
// =============================================================================

/// Maximum number of AI-generated tags kept per note.
pub const AI_TAG_LIMIT: usize = 6;

/// Maximum length (characters) of a single AI-generated tag.
pub const AI_TAG_MAX_LENGTH: usize = 100;

// =============================================================================
// MANUAL EDITS
// =============================================================================

/// Maximum length (characters) of a hand-written summary.
pub const MANUAL_SUMMARY_MAX_LENGTH: usize = 2000;

/// Maximum number of hand-written tags.
pub const MANUAL_TAG_LIMIT: usize = 10;

/// Maximum length (characters) of a single hand-written tag.
pub const MANUAL_TAG_MAX_LENGTH: usize = 50;

/// Model label stored alongside hand-written summaries.
pub const MANUAL_SUMMARY_MODEL: &str = "manual";

// =============================================================================
// BACKUPS
// =============================================================================

/// Age after which a pre-operation backup is considered expired (1 hour).
pub const BACKUP_TTL_SECS: i64 = 60 * 60;

// =============================================================================
// MONITORING
// =============================================================================

/// Number of recent classified errors kept by the error monitor.
pub const MONITOR_RECENT_CAPACITY: usize = 100;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Timeout for generation requests in seconds (HTTP client level).
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Generation slower than this is logged with `slow = true`.
pub const GEN_SLOW_THRESHOLD_MS: u64 = 30_000;
