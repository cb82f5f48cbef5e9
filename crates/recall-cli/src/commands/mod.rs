//! One module per §6 CLI command. Each `run` function owns argument
//! validation and human-readable output; all memory-engine logic lives in
//! `recall_core`.

pub mod backfill_code_embeddings;
pub mod backfill_embeddings;
pub mod delete_memory;
pub mod index_code;
pub mod index_session;
pub mod list_memories;
pub mod view_memory;

use recall_core::{Config, EmbeddingProvider, EnvMode, LocalEmbeddingProvider, MockEmbeddingProvider};

/// Build the embedding provider matching `config.env_mode`.
pub fn build_embedding_provider(config: &Config) -> Box<dyn EmbeddingProvider> {
    match config.env_mode {
        EnvMode::Production => Box::new(LocalEmbeddingProvider::new()),
        EnvMode::Mock => Box::new(MockEmbeddingProvider::new()),
    }
}

/// Format a session-id-keyed row error consistently across commands.
pub fn print_error(context: &str, err: impl std::fmt::Display) {
    eprintln!("{}: {}", colored::Colorize::red(context), err);
}
