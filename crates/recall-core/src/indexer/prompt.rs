//! Organizer-prompt rendering.
//!
//! The prompt asks the local LLM to turn a transcript into the wire schema
//! in one JSON object. It leads with a hard JSON-only requirement and
//! repeats it at the end, since organizer models drift toward prose
//! preambles and trailing commentary otherwise.

use crate::project::ProjectTag;

const SCHEMA: &str = r#"{
  "title": string (<=100 chars),
  "project": one of "THN" | "DAAS" | "FF" | "700B" | "general",
  "tags": [string, ...],
  "summary_short": string (1-2 sentences),
  "summary_detailed": string (multi-paragraph),
  "key_entities": {
    "people": [string, ...],
    "domains": [string, ...],
    "assets": [string, ...]
  },
  "key_topics": [string, ...],
  "memory_snippet": string (2-3 sentences)
}"#;

/// Render the organizer prompt for a session transcript already tagged with
/// `project_tag`. `transcript` is the `"{role}: {content}"`-per-line text
/// built by the caller.
pub fn render_organizer_prompt(project_tag: ProjectTag, transcript: &str) -> String {
    format!(
        "Your response MUST be a single JSON object, starting with {{ and ending with }}. \
Do not include any text before or after the object, and do not wrap it in markdown fences.\n\n\
You are organizing a conversation into a structured memory record. The conversation below was \
tagged \"{project_tag}\" when it started; take that as context, not as a fixed answer — you may \
propose a different project if the conversation content clearly belongs elsewhere, but the final \
decision is made by the caller, not you.\n\n\
Produce a JSON object with exactly this shape:\n\n{SCHEMA}\n\n\
Conversation transcript:\n\n{transcript}\n\n\
Remember: respond with a single JSON object, nothing else."
    )
}
