//! Data model shared by the memory store (C2), the session indexer (C3),
//! and the retrieval strategies (C6).
//!
//! All timestamps are UTC. All wire/JSON representations use camelCase
//! field names; the SQLite representation stores the same structs as JSON
//! text columns where a dedicated table isn't warranted (see
//! `storage::sqlite`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::project::ProjectTag;

/// A conversation session: one continuous exchange with the assistant,
/// tagged with the project it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Never empty — callers synthesize one from the first message or a
    /// timestamp rather than create a titleless session.
    pub title: String,
    pub project_tag: ProjectTag,
    /// `true` once this session has been passed through the indexer at
    /// least once and produced a `ProjectKnowledge`/`MemoryRecord`.
    pub indexed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, title: impl Into<String>, project_tag: ProjectTag) -> Self {
        let now = Utc::now();
        let title = title.into();
        let title = if title.trim().is_empty() {
            format!("session {now}")
        } else {
            title
        };
        Self {
            id: id.into(),
            title,
            project_tag,
            indexed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who sent a message in a session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Per-message metadata. Recognized keys per the wire contract:
/// `model`, `mockMode`, `interrupted`, `partial`, `noteRead`. `mock_mode`
/// belongs here, never on a [`MemoryRecord`] — mock runs still produce a
/// transcript, just one that was never summarized into durable memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    /// Name of the model that produced this message, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub mock_mode: bool,
    /// Set on an assistant message whose streaming was cut short by a
    /// caller-initiated cancellation.
    #[serde(default)]
    pub interrupted: bool,
    /// Set alongside `interrupted` — the saved content is a prefix of
    /// what the model would otherwise have produced.
    #[serde(default)]
    pub partial: bool,
    /// Whether an external note resource was consulted while producing
    /// this message.
    #[serde(default)]
    pub note_read: bool,
}

/// A single turn in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub meta: MessageMeta,
    pub created_at: DateTime<Utc>,
}

/// Per-project durable facts that persist across sessions, hand-curated
/// and mutated only out-of-band — the core only ever reads this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectKnowledge {
    pub project_tag: ProjectTag,
    /// Multi-paragraph prose, rendered verbatim by the context assembler.
    pub overview: String,
    /// Newline- or numbered-list-separated rules; the context assembler
    /// parses this into a numbered list at render time.
    pub rules: String,
    /// Ordered short summary strings, keyed by an ordering key (the
    /// index into this vector).
    #[serde(default)]
    pub summary_list: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Nested key-entity breakdown the organizer prompt asks for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
}

/// The durable, structured summary of a session produced by the indexer —
/// one per indexed session. This is the unit the retrieval strategies
/// (C6) search over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Primary key is `session_id` itself — one record per session, ever.
    pub session_id: String,
    pub project_tag: ProjectTag,
    /// Short, ≤100 chars. The indexer truncates anything longer.
    pub title: String,
    /// 1-2 sentences.
    pub summary_short: String,
    /// Multi-paragraph.
    pub summary_detailed: String,
    /// 2-3 sentences, optimized as future prompt context rather than as a
    /// human-facing summary.
    pub memory_snippet: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub key_entities: KeyEntities,
    /// Name of the organizer model that produced this record.
    pub indexer_model: String,
    /// Stamped from `Config::conversation_index_version`, for future
    /// migration bookkeeping.
    pub version: u32,
    pub indexed_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Spec's `MemoryRecord.title` is bounded at 100 chars; truncate
    /// anything the indexer or markdown fallback produced past that.
    pub fn truncate_title(title: &str) -> String {
        const MAX: usize = 100;
        if title.chars().count() <= MAX {
            title.to_string()
        } else {
            title.chars().take(MAX).collect()
        }
    }
}

/// A chunk of source code produced by the code indexer, with its
/// contextual-embedding header baked into `embedding_text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    pub id: String,
    pub repository_id: String,
    pub file_path: String,
    pub language: String,
    pub function_name: Option<String>,
    pub class_name: Option<String>,
    pub docstring: Option<String>,
    /// True for Python `async def` functions; false for every other chunk.
    #[serde(default)]
    pub is_async: bool,
    /// Raw source text of the chunk, unmodified.
    pub code: String,
    /// Contextual header + code, the text that was actually embedded.
    pub embedding_text: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Inherited from the repository's `RepositoryMetadata` at index time.
    #[serde(default)]
    pub production_targets: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Sidecar tracking state for an indexed repository, used by the code
/// indexer's incremental-skip check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    pub repository_id: String,
    pub root_path: String,
    pub last_indexed_commit: Option<String>,
    pub last_indexed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub production_targets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_unindexed() {
        let s = Session::new("s1", "first chat", ProjectTag::Thn);
        assert!(!s.indexed);
        assert_eq!(s.title, "first chat");
    }

    #[test]
    fn session_synthesizes_title_when_blank() {
        let s = Session::new("s1", "   ", ProjectTag::General);
        assert!(!s.title.is_empty());
    }

    #[test]
    fn message_meta_mock_mode_defaults_false() {
        let meta = MessageMeta::default();
        assert!(!meta.mock_mode);
    }

    #[test]
    fn truncates_overlong_titles() {
        let long = "x".repeat(150);
        let truncated = MemoryRecord::truncate_title(&long);
        assert_eq!(truncated.chars().count(), 100);
    }
}
