//! Local embedding provider backed by fastembed (ONNX, on-device inference).
//!
//! The model's native output width need not be 1536 — [`adapt_dimensions`]
//! truncates (Matryoshka-style) or zero-pads and renormalizes so every
//! provider in this crate honors the same fixed-width contract.

use std::sync::{Mutex, OnceLock};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{l2_normalize, EmbeddingError, EmbeddingProvider, EMBEDDING_DIMENSIONS};

/// Maximum text length handed to the model; longer input is truncated.
pub const MAX_TEXT_LENGTH: usize = 8192;

static MODEL: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("RECALL_EMBEDDING_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "recall", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/recall/fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

fn model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = MODEL.get_or_init(|| {
        let cache_dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            tracing::warn!("failed to create embedding cache dir {:?}: {}", cache_dir, e);
        }

        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(true)
            .with_cache_dir(cache_dir);

        TextEmbedding::try_new(options)
            .map(Mutex::new)
            .map_err(|e| format!("failed to initialize local embedding model: {e}"))
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

/// Truncate or zero-pad `vector` to exactly [`EMBEDDING_DIMENSIONS`] and
/// L2-renormalize. A renormalized zero-padded vector points in the same
/// direction as the original, so cosine similarity between two padded
/// vectors of the same native width is unaffected.
pub fn adapt_dimensions(mut vector: Vec<f32>) -> Vec<f32> {
    match vector.len().cmp(&EMBEDDING_DIMENSIONS) {
        std::cmp::Ordering::Greater => vector.truncate(EMBEDDING_DIMENSIONS),
        std::cmp::Ordering::Less => vector.resize(EMBEDDING_DIMENSIONS, 0.0),
        std::cmp::Ordering::Equal => {}
    }
    l2_normalize(&mut vector);
    debug_assert_eq!(vector.len(), EMBEDDING_DIMENSIONS);
    vector
}

/// Fastembed-backed [`EmbeddingProvider`].
pub struct LocalEmbeddingProvider;

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }

    /// Force model load, surfacing any initialization failure eagerly.
    pub fn init(&self) -> Result<(), EmbeddingError> {
        model().map(|_| ())
    }

    pub fn is_ready(&self) -> bool {
        model().is_ok()
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput);
        }

        let truncated = if trimmed.len() > MAX_TEXT_LENGTH {
            let mut boundary = MAX_TEXT_LENGTH;
            while !trimmed.is_char_boundary(boundary) {
                boundary -= 1;
            }
            &trimmed[..boundary]
        } else {
            trimmed
        };

        let mut model = model()?;
        let embeddings = model
            .embed(vec![truncated], None)
            .map_err(|e| EmbeddingError::Backend(e.to_string()))?;

        let raw = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Backend("no embedding returned".into()))?;

        Ok(adapt_dimensions(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapt_truncates_wide_vectors() {
        let wide = vec![1.0_f32; EMBEDDING_DIMENSIONS + 100];
        let adapted = adapt_dimensions(wide);
        assert_eq!(adapted.len(), EMBEDDING_DIMENSIONS);
    }

    #[test]
    fn adapt_pads_narrow_vectors() {
        let narrow = vec![1.0_f32; 384];
        let adapted = adapt_dimensions(narrow);
        assert_eq!(adapted.len(), EMBEDDING_DIMENSIONS);
        // direction preserved: first 384 components still proportional
        let norm: f32 = adapted.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
