//! Crate-wide error types that aren't scoped to a single component.
//!
//! Component-local errors (`EmbeddingError`, `VectorSearchError`, ...) live
//! next to the component that raises them; this module holds the ones that
//! cut across more than one, plus `StorageError`.

use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::search::VectorSearchError;

/// Errors from the memory store (C2).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("migration failed at version {version}: {source}")]
    Migration {
        version: i64,
        #[source]
        source: rusqlite::Error,
    },
    #[error("vector index error: {0}")]
    VectorSearch(#[from] VectorSearchError),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Errors from the session indexer (C3).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("session {0} has no messages to index")]
    EmptySession(String),
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("json extraction error: {0}")]
    JsonExtract(#[from] JsonExtractError),
    /// Health-check against the local LLM endpoint failed. Fatal for this
    /// indexing attempt only — the session itself is left untouched.
    #[error("local llm endpoint unavailable: {0}")]
    IndexerUnavailable(String),
}

/// Errors from the local LLM client.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm backend unreachable: {0}")]
    Unreachable(String),
    #[error("llm request timed out")]
    Timeout,
    #[error("llm model {0} not available")]
    ModelNotFound(String),
    #[error("llm generation failed: {0}")]
    Generation(String),
}

/// Errors from the tolerant JSON extractor (C4). Extraction degrades rather
/// than failing in most cases; this is for the cases it can't.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JsonExtractError {
    #[error("no JSON object or recognizable markdown fields found in text")]
    NoContentFound,
}

/// Errors from the code indexer (C5).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodeIndexError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
    #[error("repository path does not exist: {0}")]
    RepositoryNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a retrieval strategy (C6).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}
