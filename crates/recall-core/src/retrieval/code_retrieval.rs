//! Code-project retrieval: vector-topK over indexed source chunks,
//! optionally filtered by repository or production target.

use crate::embeddings::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::retrieval::Retrieval;
use crate::storage::Storage;

type Result<T> = std::result::Result<T, RetrievalError>;

/// Retrieve code chunks relevant to `user_message`.
#[cfg(feature = "vector-search")]
pub fn retrieve(
    storage: &Storage,
    embeddings: &dyn EmbeddingProvider,
    user_message: &str,
    top_k: usize,
    repository_filter: Option<&[String]>,
    production_filter: Option<&str>,
) -> Result<Retrieval> {
    if user_message.trim().is_empty() {
        return Ok(Retrieval::Empty);
    }

    let query_vector = match embeddings.embed(user_message) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("code retrieval embedding failed: {e}");
            return Ok(Retrieval::Empty);
        }
    };

    let hits =
        storage.search_code_vector(&query_vector, top_k, repository_filter, production_filter)?;

    if hits.is_empty() {
        Ok(Retrieval::Empty)
    } else {
        Ok(Retrieval::Code(hits))
    }
}

/// Without vector search compiled in, code retrieval has no ANN index to
/// query — it degrades to no results rather than failing the turn.
#[cfg(not(feature = "vector-search"))]
pub fn retrieve(
    _storage: &Storage,
    _embeddings: &dyn EmbeddingProvider,
    _user_message: &str,
    _top_k: usize,
    _repository_filter: Option<&[String]>,
    _production_filter: Option<&str>,
) -> Result<Retrieval> {
    tracing::warn!("code retrieval requires the vector-search feature; returning no results");
    Ok(Retrieval::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    #[test]
    fn empty_message_returns_empty_without_touching_store() {
        let storage = Storage::open_in_memory().unwrap();
        let embeddings = MockEmbeddingProvider::new();
        let result = retrieve(&storage, &embeddings, "", 5, None, None).unwrap();
        assert!(result.is_empty());
    }
}
