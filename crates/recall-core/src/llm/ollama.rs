//! Ollama-backed [`LlmClient`].
//!
//! Thin wrapper over `ollama-rs`. Organizer prompts run long (full session
//! transcripts) so the timeout is generous by default; callers configure it
//! via [`crate::config::Config::ollama_timeout`].

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use tracing::{debug, warn};

use super::{HealthStatus, LlmClient};
use crate::error::LlmError;

pub struct OllamaClient {
    client: Ollama,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Self {
        let (host, port) = split_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model: model.into(),
            timeout,
        }
    }
}

/// Split a `http://host:port` base URL into its host and port, falling
/// back to the standard Ollama defaults on anything unparsable.
fn split_host_port(base_url: &str) -> (String, u16) {
    let without_scheme = base_url
        .trim_end_matches('/')
        .rsplit_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);

    match without_scheme.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().unwrap_or(11434);
            (format!("http://{host}"), port)
        }
        None => (format!("http://{without_scheme}"), 11434),
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn health_check(&self) -> HealthStatus {
        match self.client.list_local_models().await {
            Ok(models) => {
                let available_models = models.into_iter().map(|m| m.name).collect::<Vec<_>>();
                debug!(count = available_models.len(), "ollama healthy");
                HealthStatus::Healthy { available_models }
            }
            Err(e) => {
                warn!("ollama health check failed: {e}");
                HealthStatus::Unhealthy {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());

        let response = tokio::time::timeout(self.timeout, self.client.generate(request))
            .await
            .map_err(|_| LlmError::Timeout)?
            .map_err(|e| LlmError::Generation(e.to_string()))?;

        Ok(response.response)
    }
}
