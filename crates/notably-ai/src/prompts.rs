//! Fixed prompt templates for note summaries and tags.

use notably_core::Note;

/// System prompt shared by both generation tasks.
pub const SYSTEM_PROMPT: &str =
    "You are a note-taking assistant. Answer in the language of the note. Output only what is asked, no explanations.";

/// Generate a summary prompt for `note`.
pub fn summary_prompt(note: &Note) -> String {
    format!(
        r#"Summarize the following note as 3 to 5 short bullet points, one per line, each starting with "- ".

Title: {title}

Content:
{content}"#,
        title = note.title,
        content = note.content
    )
}

/// Generate a tag extraction prompt for `note`.
pub fn tags_prompt(note: &Note) -> String {
    format!(
        r#"Suggest up to 6 short topic tags for the following note.
Reply with comma-separated tags on a single line, for example: rust, async, testing

Title: {title}

Content:
{content}

Tags:"#,
        title = note.title,
        content = note.content
    )
}
