//! Embedding Provider (C1)
//!
//! Produces a fixed-dimension float vector for a text input. The dimension
//! is fixed at 1536 regardless of which concrete provider is in use; local
//! models with a different native width are truncated/padded and
//! renormalized by the provider itself (see [`local::adapt_dimensions`]).

mod local;
mod mock;

pub use local::LocalEmbeddingProvider;
pub use mock::MockEmbeddingProvider;

/// Fixed embedding width carried on the wire and in the store.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Errors an [`EmbeddingProvider`] can return.
///
/// Transport errors classify into the three kinds a caller needs to pick a
/// retry policy: `RateLimited` and `Network` are the caller's to retry;
/// `AuthFailure` is fatal and should surface to an operator.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Input was empty (or all whitespace) after trimming.
    #[error("embedding input is empty")]
    InvalidInput,
    /// The underlying model returned a vector of the wrong width. Fatal.
    #[error("embedding provider returned {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Caller should back off and retry.
    #[error("embedding provider is rate limited")]
    RateLimited,
    /// Fatal; surface to an operator.
    #[error("embedding provider authentication failed: {0}")]
    AuthFailure(String),
    /// Caller should back off and retry.
    #[error("network error contacting embedding provider: {0}")]
    Network(String),
    /// Development ("mock") mode has no real embedding backend.
    #[error("embedding provider unavailable in this mode")]
    Unavailable,
    /// Local model failed to load.
    #[error("embedding model initialization failed: {0}")]
    ModelInit(String),
    /// In-process inference failed for a reason that isn't a transport error.
    #[error("embedding generation failed: {0}")]
    Backend(String),
}

/// Produces a fixed-width embedding for a text input.
///
/// No implicit batching at this layer — callers batch by calling
/// sequentially and sleeping between groups (see the code indexer).
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text`. Returns exactly [`EMBEDDING_DIMENSIONS`] floats on success.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cosine similarity between two equal-length vectors. Zero for mismatched
/// lengths rather than panicking — callers treat that as "no match".
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

/// L2-normalize a vector in place. No-op on a zero vector.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Encode a vector as little-endian bytes for storage in a BLOB column.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a vector previously encoded with [`vector_to_bytes`].
pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn bytes_roundtrip() {
        let v = vec![1.5_f32, -2.25, 0.0, 3.0];
        let bytes = vector_to_bytes(&v);
        let back = vector_from_bytes(&bytes).unwrap();
        assert_eq!(v, back);
    }
}
