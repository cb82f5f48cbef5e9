//! Session Indexer (C3)
//!
//! Turns a completed session's transcript into a structured [`MemoryRecord`]
//! via a local LLM organizer call, the Tolerant JSON Extractor, and the
//! project-tag reconciliation rule. Never raises except on a missing or
//! empty session — every other failure mode (LLM down, unparseable output)
//! degrades to [`IndexOutcome::Failed`] and leaves the session untouched.

pub mod prompt;

use chrono::Utc;
use serde_json::Value;

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::error::IndexerError;
use crate::json_extract;
use crate::llm::LlmClient;
use crate::memory::{KeyEntities, MemoryRecord};
use crate::project::{self, ProjectTag};
use crate::storage::Storage;

type Result<T> = std::result::Result<T, IndexerError>;

/// Flags the CLI's `index-session`/`refresh-memory` commands pass through
/// to the §4.3 reconciliation step.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Treat the session as tagged with this project for reconciliation
    /// purposes, overriding whatever is currently stored on the session row.
    pub override_project: Option<ProjectTag>,
    /// When the effective session tag is `general`, keep `general`
    /// regardless of what the LLM proposes.
    pub preserve_project: bool,
}

/// Outcome of one indexing attempt. Never an error for the "LLM said
/// nothing usable" case — that's [`IndexOutcome::Failed`], not an `Err`.
#[derive(Debug, Clone)]
pub enum IndexOutcome {
    Indexed(MemoryRecord),
    /// Indexing failed; the session and its messages are untouched and no
    /// `MemoryRecord` row was written.
    Failed { session_id: String, reason: String },
}

const SENTINEL_REASON: &str = "indexing failed, conversation preserved";

/// Run the full C3 pipeline for `session_id`.
pub async fn index_session(
    storage: &Storage,
    llm: &dyn LlmClient,
    embeddings: Option<&dyn EmbeddingProvider>,
    config: &Config,
    session_id: &str,
    opts: IndexOptions,
) -> Result<IndexOutcome> {
    let span = tracing::info_span!("index_session", session_id, project = tracing::field::Empty);
    let _enter = span.enter();

    let session = storage
        .get_session(session_id)?
        .ok_or_else(|| IndexerError::SessionNotFound(session_id.to_string()))?;

    let messages = storage.load_messages(session_id)?;
    if messages.is_empty() {
        return Err(IndexerError::EmptySession(session_id.to_string()));
    }

    let effective_session_tag = opts.override_project.unwrap_or(session.project_tag);
    span.record("project", effective_session_tag.as_str());

    let transcript = build_transcript(&messages);
    let organizer_prompt = prompt::render_organizer_prompt(effective_session_tag, &transcript);

    let health = llm.health_check().await;
    if !health.is_healthy() {
        return Err(IndexerError::IndexerUnavailable(match health {
            crate::llm::HealthStatus::Unhealthy { reason } => reason,
            crate::llm::HealthStatus::Healthy { .. } => unreachable!(),
        }));
    }

    let raw_response = match llm.generate(&organizer_prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("organizer llm call failed: {e}");
            return Ok(IndexOutcome::Failed {
                session_id: session_id.to_string(),
                reason: SENTINEL_REASON.to_string(),
            });
        }
    };

    let fields = match json_extract::extract_json_object(&raw_response) {
        Ok(map) => map,
        Err(_) => match json_extract::extract_from_markdown(&raw_response) {
            Some(map) => {
                tracing::info!("organizer output required markdown fallback reconstruction");
                map
            }
            None => {
                tracing::warn!("organizer output had no recoverable structure");
                return Ok(IndexOutcome::Failed {
                    session_id: session_id.to_string(),
                    reason: SENTINEL_REASON.to_string(),
                });
            }
        },
    };

    let title = MemoryRecord::truncate_title(
        &string_field(&fields, "title").unwrap_or_else(|| session.title.clone()),
    );
    let summary_short =
        string_field(&fields, "summary_short").unwrap_or_else(|| "Missing summary_short".into());
    let summary_detailed = string_field(&fields, "summary_detailed")
        .unwrap_or_else(|| "Missing summary_detailed".into());
    let memory_snippet =
        string_field(&fields, "memory_snippet").unwrap_or_else(|| "Missing memory_snippet".into());
    let tags = string_list_field(&fields, "tags");
    let key_topics = string_list_field(&fields, "key_topics");
    let key_entities = key_entities_field(&fields);
    let llm_project = fields.get("project").and_then(Value::as_str);

    let reconciled_tag =
        reconcile_project_tag(effective_session_tag, opts.preserve_project, llm_project);

    if reconciled_tag != session.project_tag {
        storage.update_session_project_tag(session_id, reconciled_tag)?;
    }

    let record = MemoryRecord {
        session_id: session_id.to_string(),
        project_tag: reconciled_tag,
        title,
        summary_short,
        summary_detailed,
        memory_snippet,
        tags,
        key_topics,
        key_entities,
        indexer_model: config.ollama_model.clone(),
        version: config.conversation_index_version,
        indexed_at: Utc::now(),
    };

    storage.upsert_memory_record(&record)?;
    storage.set_session_indexed(session_id, true)?;

    #[cfg(feature = "vector-search")]
    if reconciled_tag.uses_vector_retrieval() {
        if let Some(embeddings) = embeddings {
            let embed_text = format!(
                "{}\n\n{}\n\n{}",
                record.title, record.summary_detailed, record.memory_snippet
            );
            match embeddings.embed(&embed_text) {
                Ok(vector) => storage.set_memory_embedding(session_id, &vector)?,
                Err(e) => tracing::warn!("failed to embed memory record {session_id}: {e}"),
            }
        }
    }

    Ok(IndexOutcome::Indexed(record))
}

fn build_transcript(messages: &[crate::memory::Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", role_label(m.role), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn role_label(role: crate::memory::Role) -> &'static str {
    match role {
        crate::memory::Role::User => "user",
        crate::memory::Role::Assistant => "assistant",
        crate::memory::Role::System => "system",
    }
}

/// §4.3 step 9: reconcile the session's own tag against the LLM's
/// advisory suggestion.
fn reconcile_project_tag(
    session_tag: ProjectTag,
    preserve_project: bool,
    llm_project: Option<&str>,
) -> ProjectTag {
    if !session_tag.is_general() {
        return session_tag;
    }
    if preserve_project {
        return ProjectTag::General;
    }
    match llm_project {
        Some(raw) => {
            let candidate = project::normalize_project_tag(raw);
            if candidate.is_general() {
                ProjectTag::General
            } else {
                candidate
            }
        }
        None => ProjectTag::General,
    }
}

fn string_field(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list_field(fields: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn key_entities_field(fields: &serde_json::Map<String, Value>) -> KeyEntities {
    let Some(obj) = fields.get("key_entities").and_then(Value::as_object) else {
        return KeyEntities::default();
    };
    let list = |key: &str| -> Vec<String> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };
    KeyEntities {
        people: list("people"),
        domains: list("domains"),
        assets: list("assets"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_session_tag_always_wins() {
        let tag = reconcile_project_tag(ProjectTag::Thn, false, Some("DAAS"));
        assert_eq!(tag, ProjectTag::Thn);
    }

    #[test]
    fn general_with_preserve_stays_general() {
        let tag = reconcile_project_tag(ProjectTag::General, true, Some("FF"));
        assert_eq!(tag, ProjectTag::General);
    }

    #[test]
    fn general_promotes_to_valid_llm_tag() {
        let tag = reconcile_project_tag(ProjectTag::General, false, Some("FF"));
        assert_eq!(tag, ProjectTag::Ff);
    }

    #[test]
    fn invalid_llm_tag_falls_back_to_general() {
        let tag = reconcile_project_tag(ProjectTag::General, false, Some("not a real project"));
        assert_eq!(tag, ProjectTag::General);
    }

    #[test]
    fn missing_llm_tag_falls_back_to_general() {
        let tag = reconcile_project_tag(ProjectTag::General, false, None);
        assert_eq!(tag, ProjectTag::General);
    }
}
