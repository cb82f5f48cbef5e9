//! `backfill-code-embeddings` — recompute missing code-chunk embeddings.

use std::thread::sleep;
use std::time::Duration;

use colored::Colorize;
use recall_core::{Config, EmbeddingProvider, Storage};

const BATCH_SIZE: usize = 50;
const BATCH_PAUSE: Duration = Duration::from_secs(1);

pub fn run(storage: &Storage, config: &Config, repository: Option<&str>) -> anyhow::Result<()> {
    let embeddings = super::build_embedding_provider(config);

    let chunks = storage.list_code_chunks_missing_embedding(repository)?;
    if chunks.is_empty() {
        println!("no code chunks missing embeddings");
        return Ok(());
    }

    let mut done = 0usize;
    let mut failed = 0usize;

    let num_batches = chunks.chunks(BATCH_SIZE).count();
    for (batch_index, batch) in chunks.chunks(BATCH_SIZE).enumerate() {
        for chunk in batch {
            match embeddings.embed(&chunk.embedding_text) {
                Ok(vector) => {
                    storage.set_code_chunk_embedding(&chunk.id, &vector)?;
                    done += 1;
                }
                Err(e) => {
                    super::print_error("embedding failed", format!("{}: {e}", chunk.file_path));
                    failed += 1;
                }
            }
        }
        if batch_index + 1 < num_batches {
            sleep(BATCH_PAUSE);
        }
    }

    println!("{} {done} code embeddings, {failed} failures", "backfilled".green());
    Ok(())
}
