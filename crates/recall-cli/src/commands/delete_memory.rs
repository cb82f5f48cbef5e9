//! `delete-memory` — hard delete of the record; the session is left untouched.

use colored::Colorize;
use recall_core::Storage;

pub fn run(storage: &Storage, session_id: &str) -> anyhow::Result<()> {
    if storage.delete_memory_record(session_id)? {
        println!("{} memory record for {session_id}", "deleted".green());
    } else {
        super::print_error("no memory record to delete for session", session_id);
    }
    Ok(())
}
