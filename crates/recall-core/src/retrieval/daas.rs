//! DAAS retrieval: quoted-title single-record lookup, or vector-topK
//! pattern mode over dream memories. The two modes are never mixed.

use std::sync::OnceLock;

use regex::Regex;

use crate::embeddings::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::project::ProjectTag;
use crate::retrieval::Retrieval;
use crate::storage::Storage;

type Result<T> = std::result::Result<T, RetrievalError>;

const MAX_TITLE_LEN: usize = 500;
const PATTERN_DEFAULT_K: usize = 5;
const PATTERN_CEILING_K: usize = 5;
const PATTERN_FLOOR_K: usize = 3;

fn quoted_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).unwrap())
}

/// First quoted substring in `user_message`, trimmed and truncated to
/// [`MAX_TITLE_LEN`] chars, if present.
pub fn extract_quoted_title(user_message: &str) -> Option<String> {
    let captured = quoted_title_regex()
        .captures(user_message)?
        .get(1)?
        .as_str()
        .trim();
    if captured.is_empty() {
        return None;
    }
    Some(captured.chars().take(MAX_TITLE_LEN).collect())
}

/// Clamp a requested top-k to the pattern-mode floor/ceiling.
fn clamp_k(requested: usize) -> usize {
    requested.clamp(PATTERN_FLOOR_K, PATTERN_CEILING_K)
}

/// Retrieve for a DAAS user turn. Dispatches on whether `user_message`
/// contains a quoted title.
pub fn retrieve(
    storage: &Storage,
    embeddings: &dyn EmbeddingProvider,
    user_message: &str,
    default_k: usize,
) -> Result<Retrieval> {
    if user_message.trim().is_empty() {
        return Ok(Retrieval::Empty);
    }

    match extract_quoted_title(user_message) {
        Some(title) => retrieve_single_dream(storage, &title),
        None => retrieve_pattern_dreams(storage, embeddings, user_message, default_k),
    }
}

fn retrieve_single_dream(storage: &Storage, title: &str) -> Result<Retrieval> {
    let matches = storage.search_memory_title(ProjectTag::Daas, title, 1)?;
    match matches.into_iter().next() {
        Some(record) => Ok(Retrieval::SingleDream(record)),
        None => Ok(Retrieval::NoTitleMatch),
    }
}

#[cfg(feature = "vector-search")]
fn retrieve_pattern_dreams(
    storage: &Storage,
    embeddings: &dyn EmbeddingProvider,
    user_message: &str,
    default_k: usize,
) -> Result<Retrieval> {
    let k = clamp_k(if default_k == 0 {
        PATTERN_DEFAULT_K
    } else {
        default_k
    });

    let query_vector = match embeddings.embed(user_message) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("daas pattern embedding failed: {e}");
            return Ok(Retrieval::Empty);
        }
    };

    let hits = storage.search_memory_vector(ProjectTag::Daas, &query_vector, k)?;
    if hits.is_empty() {
        Ok(Retrieval::Empty)
    } else {
        Ok(Retrieval::PatternDreams(hits))
    }
}

/// Without vector search compiled in, pattern mode has no ANN index to
/// query — it degrades to no results rather than failing the turn.
#[cfg(not(feature = "vector-search"))]
fn retrieve_pattern_dreams(
    _storage: &Storage,
    _embeddings: &dyn EmbeddingProvider,
    _user_message: &str,
    _default_k: usize,
) -> Result<Retrieval> {
    tracing::warn!("daas pattern retrieval requires the vector-search feature; returning no results");
    Ok(Retrieval::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_quoted_title() {
        let msg = r#"Tell me about "Red Door" and "Other""#;
        assert_eq!(extract_quoted_title(msg).as_deref(), Some("Red Door"));
    }

    #[test]
    fn no_quotes_means_pattern_mode() {
        assert_eq!(extract_quoted_title("recurring symbol of water"), None);
    }

    #[test]
    fn truncates_overlong_titles() {
        let long = "a".repeat(600);
        let msg = format!("\"{long}\"");
        let extracted = extract_quoted_title(&msg).unwrap();
        assert_eq!(extracted.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn clamps_k_to_floor_and_ceiling() {
        assert_eq!(clamp_k(0), PATTERN_FLOOR_K);
        assert_eq!(clamp_k(1), PATTERN_FLOOR_K);
        assert_eq!(clamp_k(100), PATTERN_CEILING_K);
        assert_eq!(clamp_k(4), 4);
    }
}
