//! # recall-core
//!
//! Per-project conversational memory and retrieval engine. Indexes chat
//! sessions into durable, structured summaries; indexes a codebase into
//! embedded chunks; and assembles retrieval results plus durable project
//! knowledge into a single context block for a system prompt.
//!
//! ## Components
//!
//! - [`embeddings`]: fixed-width (1536) embedding generation, local or mock.
//! - [`storage`]: the memory store — SQLite-backed, one writer connection
//!   and one reader connection guarded by independent mutexes, an on-disk
//!   HNSW vector index alongside it.
//! - [`search`]: the HNSW vector-search backend used by the store.
//! - [`json_extract`]: tolerant extraction of a JSON object from LLM output
//!   that may be wrapped in markdown fences, commented, or malformed.
//! - [`llm`]: a local LLM client (Ollama) used by the session indexer.
//! - [`indexer`]: the session indexer — turns a transcript into a
//!   [`memory::MemoryRecord`].
//! - [`code`]: the code indexer — turns a repository into embedded
//!   [`memory::CodeChunk`]s.
//! - [`retrieval`]: project-specific retrieval strategies over the store.
//! - [`context`]: assembles a retrieval result and project knowledge into
//!   the text block handed to a system prompt.
//! - [`project`]: the closed project-tag set.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recall_core::{Config, Storage};
//!
//! let config = Config::new("/path/to/recall.db");
//! let storage = Storage::new(&config)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings` (default): local embedding generation via fastembed.
//! - `vector-search` (default): HNSW vector search via usearch.
//! - `bundled-sqlite` (default): vendor and statically link SQLite.
//! - `encryption`: SQLCipher-backed encrypted storage instead of plain SQLite.
//! - `full`: all of the above.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod indexer;
pub mod json_extract;
pub mod llm;
pub mod memory;
pub mod project;
pub mod retrieval;
pub mod storage;

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub mod embeddings;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod search;

pub mod code;

pub use config::{Config, EnvMode};
pub use context::{assemble_context, build_system_prompt, AssembleRequest, ContextResult, NoteSource};
pub use error::{CodeIndexError, IndexerError, JsonExtractError, LlmError, RetrievalError, StorageError};
pub use indexer::{index_session, IndexOptions, IndexOutcome};
pub use memory::{
    CodeChunk, KeyEntities, Message, MessageMeta, MemoryRecord, ProjectKnowledge,
    RepositoryMetadata, Role, Session,
};
pub use project::{normalize_project_tag, ProjectTag};
pub use retrieval::Retrieval;
pub use storage::Storage;

#[cfg(feature = "embeddings")]
pub use embeddings::{
    cosine_similarity, EmbeddingError, EmbeddingProvider, LocalEmbeddingProvider,
    MockEmbeddingProvider, EMBEDDING_DIMENSIONS,
};

#[cfg(feature = "vector-search")]
pub use search::{VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        Config, MemoryRecord, ProjectTag, Session, Storage, StorageError,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::{EmbeddingProvider, EMBEDDING_DIMENSIONS};

    #[cfg(feature = "vector-search")]
    pub use crate::VectorIndex;
}
