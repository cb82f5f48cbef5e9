//! Development-mode embedding provider.
//!
//! Every call fails `Unavailable` — callers must degrade, never synthesize
//! a zero vector in its place (see C1's mock-mode contract).

use super::{EmbeddingError, EmbeddingProvider};

#[derive(Debug, Default)]
pub struct MockEmbeddingProvider;

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_always_unavailable() {
        let provider = MockEmbeddingProvider::new();
        assert!(matches!(
            provider.embed("hello"),
            Err(EmbeddingError::Unavailable)
        ));
    }
}
