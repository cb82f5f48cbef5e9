//! Local LLM client used by the session indexer's organizer step.
//!
//! Only one backend today: a local Ollama server. Kept behind a trait so
//! the indexer can be tested against a canned client instead of a real
//! server.

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;

use crate::error::LlmError;

/// Whether the backend is reachable and which models it currently has
/// loaded.
#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy { available_models: Vec<String> },
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

/// A local LLM backend capable of a single-shot completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn health_check(&self) -> HealthStatus;

    /// Generate a completion for `prompt`. Implementations request
    /// JSON-formatted output from the backend on a best-effort basis; the
    /// caller is still responsible for tolerant extraction (see
    /// `json_extract`), since the backend can't guarantee well-formed JSON.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
