//! Runtime configuration.
//!
//! One struct, constructed by the CLI from environment variables and
//! defaults. Nothing in `recall-core` reads the environment directly —
//! keeping that at the edge makes the library testable without env state.

use std::path::PathBuf;
use std::time::Duration;

/// Whether the process is running against real backends or in development
/// mode with mocked embeddings and no LLM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Production,
    Mock,
}

impl EnvMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, EnvMode::Mock)
    }
}

/// Process-wide configuration for `recall-core` components.
#[derive(Debug, Clone)]
pub struct Config {
    pub env_mode: EnvMode,
    pub db_path: PathBuf,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout: Duration,
    pub daas_vector_top_k: usize,
    pub conversation_index_version: u32,
    /// Whether THN's conversation-RAG section is only attached to a
    /// session's first message (`true`) or every message.
    pub thn_rag_first_message_only: bool,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            env_mode: EnvMode::Production,
            db_path: db_path.into(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1".to_string(),
            ollama_timeout: Duration::from_secs(300),
            daas_vector_top_k: 5,
            conversation_index_version: 1,
            thn_rag_first_message_only: true,
        }
    }

    pub fn mock(db_path: impl Into<PathBuf>) -> Self {
        Self {
            env_mode: EnvMode::Mock,
            ..Self::new(db_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_notes() {
        let cfg = Config::new("/tmp/recall.db");
        assert_eq!(cfg.daas_vector_top_k, 5);
        assert!(cfg.thn_rag_first_message_only);
        assert_eq!(cfg.ollama_timeout, Duration::from_secs(300));
        assert!(!cfg.env_mode.is_mock());
    }

    #[test]
    fn mock_sets_mock_env_mode() {
        let cfg = Config::mock("/tmp/recall.db");
        assert!(cfg.env_mode.is_mock());
    }
}
