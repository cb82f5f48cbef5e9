//! Vector similarity search.
//!
//! HNSW-backed implementation of the abstract `vector_search` interface
//! used by the memory store and code index. Keep usearch's distance
//! conventions confined to this module.

mod vector;

pub use vector::{
    VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError, DEFAULT_CONNECTIVITY,
    DEFAULT_DIMENSIONS,
};
