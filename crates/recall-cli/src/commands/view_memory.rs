//! `view-memory` — single-record fetch.

use colored::Colorize;
use recall_core::Storage;

pub fn run(storage: &Storage, session_id: &str) -> anyhow::Result<()> {
    let Some(record) = storage.get_memory_record(session_id)? else {
        super::print_error("no memory record for session", session_id);
        return Ok(());
    };

    println!("{}", record.title.bold());
    println!("project:  {}", record.project_tag);
    println!("indexed:  {}", record.indexed_at.to_rfc3339());
    println!("version:  {}", record.version);
    println!("model:    {}", record.indexer_model);
    println!("tags:     {}", record.tags.join(", "));
    println!("topics:   {}", record.key_topics.join(", "));
    println!();
    println!("{}", record.summary_short);
    println!();
    println!("{}", record.summary_detailed);
    println!();
    println!("{}", "memory snippet".dimmed());
    println!("{}", record.memory_snippet);

    if !record.key_entities.people.is_empty() {
        println!("people:   {}", record.key_entities.people.join(", "));
    }
    if !record.key_entities.domains.is_empty() {
        println!("domains:  {}", record.key_entities.domains.join(", "));
    }
    if !record.key_entities.assets.is_empty() {
        println!("assets:   {}", record.key_entities.assets.join(", "));
    }

    Ok(())
}
