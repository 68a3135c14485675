//! Parsing of model tag output.

use tracing::trace;

use notably_core::defaults::{AI_TAG_LIMIT, AI_TAG_MAX_LENGTH};

/// Turn a comma-separated model reply into at most [`AI_TAG_LIMIT`] tags.
///
/// Entries are trimmed and lose a leading `#`; empty entries and entries
/// longer than [`AI_TAG_MAX_LENGTH`] characters are dropped, as are exact
/// duplicates (first occurrence wins). An empty result means the reply had
/// no usable tags.
pub fn parse_tags(response: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in response.split(',') {
        let tag = raw.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag).trim();
        if tag.is_empty() || tag.chars().count() > AI_TAG_MAX_LENGTH {
            trace!(tag = raw, "Dropping unusable tag");
            continue;
        }
        if tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == AI_TAG_LIMIT {
            break;
        }
    }
    tags
}
