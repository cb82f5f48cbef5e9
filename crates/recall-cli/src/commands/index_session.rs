//! `index-session` / `refresh-memory`.

use colored::Colorize;
use recall_core::{Config, IndexOptions, IndexOutcome, ProjectTag, Storage};

use super::build_embedding_provider;

pub async fn run(
    storage: &Storage,
    config: &Config,
    session_id: &str,
    override_project: Option<ProjectTag>,
    preserve_project: bool,
) -> anyhow::Result<()> {
    let llm = recall_core::llm::OllamaClient::new(
        &config.ollama_base_url,
        &config.ollama_model,
        config.ollama_timeout,
    );
    let embeddings = build_embedding_provider(config);

    let opts = IndexOptions {
        override_project,
        preserve_project,
    };

    match recall_core::index_session(storage, &llm, Some(embeddings.as_ref()), config, session_id, opts)
        .await?
    {
        IndexOutcome::Indexed(record) => {
            println!("{} {} \"{}\"", "indexed".green(), record.session_id, record.title);
            println!("  project: {}", record.project_tag);
            println!("  tags: {}", record.tags.join(", "));
            println!("  summary: {}", record.summary_short);
        }
        IndexOutcome::Failed { session_id, reason } => {
            super::print_error("indexing failed, conversation preserved", format!("{session_id}: {reason}"));
        }
    }

    Ok(())
}
