//! `backfill-embeddings` — recompute missing memory-record embeddings in
//! rate-respecting batches of 50, sleeping 1s between batches.

use std::thread::sleep;
use std::time::Duration;

use colored::Colorize;
use recall_core::{Config, EmbeddingProvider, ProjectTag, Storage};

const BATCH_SIZE: usize = 50;
const BATCH_PAUSE: Duration = Duration::from_secs(1);

pub fn run(storage: &Storage, config: &Config, project: Option<ProjectTag>) -> anyhow::Result<()> {
    let embeddings = super::build_embedding_provider(config);

    let records = storage.list_memory_records_missing_embedding(project)?;
    if records.is_empty() {
        println!("no memory records missing embeddings");
        return Ok(());
    }

    let mut done = 0usize;
    let mut failed = 0usize;

    let num_batches = records.chunks(BATCH_SIZE).count();
    for (batch_index, batch) in records.chunks(BATCH_SIZE).enumerate() {
        for record in batch {
            let text = format!(
                "{}\n\n{}\n\n{}",
                record.title, record.summary_detailed, record.memory_snippet
            );
            match embeddings.embed(&text) {
                Ok(vector) => {
                    storage.set_memory_embedding(&record.session_id, &vector)?;
                    done += 1;
                }
                Err(e) => {
                    super::print_error("embedding failed", format!("{}: {e}", record.session_id));
                    failed += 1;
                }
            }
        }
        if batch_index + 1 < num_batches {
            sleep(BATCH_PAUSE);
        }
    }

    println!("{} {done} embeddings, {failed} failures", "backfilled".green());
    Ok(())
}
