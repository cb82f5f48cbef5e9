//! Memory Store (C2)
//!
//! SQLite-based storage for sessions, messages, project knowledge, memory
//! records, and code chunks, backed by a writer/reader connection pair and
//! (when the `vector-search` feature is on) an in-memory HNSW index per
//! embedded corpus.

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage};
