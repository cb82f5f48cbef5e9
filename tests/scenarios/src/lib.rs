//! Shared test doubles and fixtures for the end-to-end scenario suite in
//! `tests/`. Exercises `recall-core` the way a caller would: through
//! `Storage`, `index_session`, and the retrieval/context APIs, never
//! through private internals.

pub mod harness;

pub use harness::{CannedLlmClient, TestEmbeddingProvider};
