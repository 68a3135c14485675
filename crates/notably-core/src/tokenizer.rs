//! Fast, script-aware token estimation for pre-flight budget checks.
//!
//! Latin-script text costs roughly a quarter token per character, while
//! Hangul, Han, Kana, Cyrillic and other non-Latin scripts cost about one
//! and a half. Script-neutral characters (digits, punctuation, whitespace)
//! are priced like Latin text.

use unicode_script::{Script, UnicodeScript};

use crate::defaults::{TOKENS_PER_LATIN_CHAR, TOKENS_PER_NON_LATIN_CHAR};

fn is_latin_priced(c: char) -> bool {
    matches!(c.script(), Script::Latin | Script::Common | Script::Inherited)
}

/// Estimate the token count of `text` (rounded up).
pub fn estimate_tokens(text: &str) -> usize {
    let (latin, other) = text.chars().fold((0usize, 0usize), |(latin, other), c| {
        if is_latin_priced(c) {
            (latin + 1, other)
        } else {
            (latin, other + 1)
        }
    });
    let estimate = latin as f64 * TOKENS_PER_LATIN_CHAR + other as f64 * TOKENS_PER_NON_LATIN_CHAR;
    estimate.ceil() as usize
}

/// Check whether `text` is estimated to exceed `limit` tokens.
pub fn exceeds_token_limit(text: &str, limit: usize) -> bool {
    estimate_tokens(text) > limit
}
