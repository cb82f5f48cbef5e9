//! `index-code` — walk and index a source repository (§4.5).

use std::path::Path;

use colored::Colorize;
use recall_core::{Config, Storage};

pub fn run(
    storage: &Storage,
    config: &Config,
    path: &Path,
    name: &str,
    production_targets: &[String],
) -> anyhow::Result<()> {
    let embeddings = super::build_embedding_provider(config);

    let stats = recall_core::code::index_repository(storage, embeddings.as_ref(), name, path, production_targets)?;

    println!(
        "{} {}: {} files scanned, {} chunks created, {} embedded, {} failed",
        "indexed".green(),
        name,
        stats.files_scanned,
        stats.chunks_created,
        stats.chunks_embedded,
        stats.chunks_embed_failed
    );

    for error in &stats.errors {
        super::print_error("code index error", error);
    }

    Ok(())
}
