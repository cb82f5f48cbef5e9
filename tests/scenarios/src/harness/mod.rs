//! Test doubles for the two external collaborators the core talks to: the
//! embedding provider and the local organizer LLM. Both are deterministic
//! so scenario assertions don't depend on wall-clock or network state.

use async_trait::async_trait;
use recall_core::llm::{HealthStatus, LlmClient};
use recall_core::{EmbeddingError, EmbeddingProvider, Message, MessageMeta, Role, Session, Storage, EMBEDDING_DIMENSIONS};

/// Deterministic, content-sensitive embedding provider for tests.
///
/// Not a stand-in for "mock mode" (which always fails per C1's contract) —
/// this is a fake with a real implementation, just one cheap enough to run
/// in-process. Each word hashes into a handful of dimensions so that
/// semantically similar test fixtures (sharing words) land closer in
/// cosine space than unrelated ones, without pulling in a real model.
pub struct TestEmbeddingProvider;

impl TestEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TestEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for TestEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput);
        }

        let mut vector = vec![0.0_f32; EMBEDDING_DIMENSIONS];
        for word in text.to_lowercase().split_whitespace() {
            let hash = fnv1a(word.as_bytes());
            for i in 0..8 {
                let idx = ((hash.rotate_left(i as u32 * 7)) as usize) % EMBEDDING_DIMENSIONS;
                vector[idx] += 1.0;
            }
        }

        recall_core::embeddings::l2_normalize(&mut vector);
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// A scripted local-LLM client: returns a canned organizer response, or
/// simulates an unreachable/timed-out endpoint when constructed with
/// [`CannedLlmClient::unavailable`].
pub struct CannedLlmClient {
    response: Option<String>,
}

impl CannedLlmClient {
    pub fn responding(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// Simulates §4.3 step 5/6: the health check fails (or the call times
    /// out), so indexing degrades to the "indexing failed" sentinel path.
    pub fn unavailable() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl LlmClient for CannedLlmClient {
    async fn health_check(&self) -> HealthStatus {
        match &self.response {
            Some(_) => HealthStatus::Healthy {
                available_models: vec!["llama3.1".to_string()],
            },
            None => HealthStatus::Unhealthy {
                reason: "organizer endpoint unreachable".to_string(),
            },
        }
    }

    async fn generate(&self, _prompt: &str) -> Result<String, recall_core::error::LlmError> {
        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(recall_core::error::LlmError::Timeout),
        }
    }
}

/// Create and persist a session with the given messages (alternating
/// user/assistant roles starting with `user`), returning its id.
pub fn seed_session(storage: &Storage, session_id: &str, title: &str, project_tag: recall_core::ProjectTag, turns: &[&str]) {
    let session = Session::new(session_id, title, project_tag);
    storage.upsert_session(&session).unwrap();

    for (i, content) in turns.iter().enumerate() {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        let message = Message {
            id: format!("{session_id}-m{i}"),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            meta: MessageMeta::default(),
            created_at: chrono::Utc::now() + chrono::Duration::milliseconds(i as i64),
        };
        storage.append_message(&message).unwrap();
    }
}

/// Build a `MemoryRecord` directly (bypassing the indexer) for seeding
/// retrieval-strategy fixtures.
pub fn make_record(
    session_id: &str,
    project_tag: recall_core::ProjectTag,
    title: &str,
    summary_detailed: &str,
) -> recall_core::MemoryRecord {
    recall_core::MemoryRecord {
        session_id: session_id.to_string(),
        project_tag,
        title: title.to_string(),
        summary_short: title.to_string(),
        summary_detailed: summary_detailed.to_string(),
        memory_snippet: summary_detailed.to_string(),
        tags: vec![],
        key_topics: vec![],
        key_entities: recall_core::KeyEntities::default(),
        indexer_model: "llama3.1".to_string(),
        version: 1,
        indexed_at: chrono::Utc::now(),
    }
}
