//! `list-memories` — read-only projection over `MemoryRecord`.

use colored::Colorize;
use recall_core::{ProjectTag, Storage};

pub fn run(storage: &Storage, project: Option<ProjectTag>, limit: usize) -> anyhow::Result<()> {
    let records = storage.list_memory_records(project, limit)?;

    if records.is_empty() {
        println!("no memories found");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {}",
            record.session_id.dimmed(),
            record.project_tag.to_string().cyan(),
            record.title
        );
    }

    Ok(())
}
