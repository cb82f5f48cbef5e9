//! Code Indexer (C5)
//!
//! Walks a repository, chunks each recognized source file with a
//! language-specific strategy, embeds each chunk with its contextual
//! header, and persists the result. Re-indexing is skipped entirely when
//! the repository's current commit matches the last one indexed.

mod bash;
mod config_lang;
mod lines;
mod python;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::embeddings::EmbeddingProvider;
use crate::error::CodeIndexError;
use crate::memory::{CodeChunk, RepositoryMetadata};
use crate::storage::Storage;

type Result<T> = std::result::Result<T, CodeIndexError>;

/// Directory names never descended into.
const EXCLUDED_DIRS: &[&str] = &[
    ".git", "node_modules", "target", "dist", "build", "__pycache__", ".venv", "venv", ".tox",
];

/// Batch size and inter-batch pause for embedding generation, matching the
/// rate the embedding provider is expected to sustain.
const EMBEDDING_BATCH_SIZE: usize = 50;
const EMBEDDING_BATCH_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    Bash,
    Json,
    Yaml,
    Toml,
    ConfigLike,
    Other,
}

fn detect_language(path: &Path) -> Language {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => Language::Python,
        Some("sh") | Some("bash") | Some("zsh") => Language::Bash,
        Some("json") => Language::Json,
        Some("yaml") | Some("yml") => Language::Yaml,
        Some("toml") => Language::Toml,
        Some("ini") | Some("cfg") | Some("conf") => Language::ConfigLike,
        Some(_) => Language::Other,
        None => detect_language_by_shebang(path),
    }
}

fn detect_language_by_shebang(path: &Path) -> Language {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Language::Other;
    };
    let Some(first_line) = content.lines().next() else {
        return Language::Other;
    };
    if !first_line.starts_with("#!") {
        return Language::Other;
    }
    if first_line.contains("python") {
        Language::Python
    } else if first_line.contains("bash") || first_line.contains("/sh") {
        Language::Bash
    } else {
        Language::Other
    }
}

fn language_label(lang: Language) -> &'static str {
    match lang {
        Language::Python => "python",
        Language::Bash => "bash",
        Language::Json => "json",
        Language::Yaml => "yaml",
        Language::Toml => "toml",
        Language::ConfigLike => "config",
        Language::Other => "text",
    }
}

/// Whether this file should be read as source at all (binary/asset
/// extensions are skipped outright).
fn is_indexable(path: &Path) -> bool {
    const SKIP_EXT: &[&str] = &[
        "png", "jpg", "jpeg", "gif", "ico", "svg", "woff", "woff2", "ttf", "lock", "bin", "so",
        "dylib", "dll", "zip", "tar", "gz", "pdf",
    ];
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if SKIP_EXT.contains(&ext.to_lowercase().as_str()) => false,
        _ => true,
    }
}

fn walk_repository(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if path.is_dir() {
                if !EXCLUDED_DIRS.contains(&name.as_ref()) && !name.starts_with('.') {
                    stack.push(path);
                }
                continue;
            }

            if is_indexable(&path) {
                files.push(path);
            }
        }
    }

    files
}

/// Current HEAD commit hash of the repository at `root`, if it's a git
/// repository at all.
fn current_commit(root: &Path) -> Option<String> {
    let repo = git2::Repository::open(root).ok()?;
    let head = repo.head().ok()?;
    let commit = head.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}

fn build_contextual_header(chunk: &RawChunkWithPath) -> String {
    let mut header = format!("# File: {}", chunk.file_path);
    if let Some(name) = &chunk.raw.function_name {
        header.push_str(&format!("\n# Function: {name}"));
    }
    if let Some(name) = &chunk.raw.class_name {
        header.push_str(&format!("\n# Class: {name}"));
    }
    if chunk.raw.function_name.is_none() && chunk.raw.class_name.is_none() {
        if let Some(stem) = Path::new(&chunk.file_path).file_name() {
            header.push_str(&format!("\n# File: {}", stem.to_string_lossy()));
        }
    }
    if let Some(doc) = &chunk.raw.docstring {
        header.push_str(&format!("\n# {doc}"));
    }
    header
}

struct RawChunkWithPath {
    raw: lines::RawChunk,
    file_path: String,
    language: Language,
}

fn chunk_file(path: &Path, content: &str, language: Language) -> Vec<lines::RawChunk> {
    match language {
        Language::Python => python::chunk_python(content),
        Language::Bash => bash::chunk_bash(content),
        Language::Json => config_lang::chunk_json(content),
        Language::Yaml | Language::Toml | Language::ConfigLike => {
            config_lang::chunk_whole_file(content)
        }
        Language::Other => {
            let _ = path;
            lines::chunk_by_lines(content)
        }
    }
}

/// Outcome of one code-indexing run. Per-file and per-chunk failures are
/// accumulated here rather than aborting the run.
#[derive(Debug, Clone, Default)]
pub struct CodeIndexStats {
    pub files_scanned: usize,
    pub files_skipped_unreadable: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub chunks_embed_failed: usize,
    pub errors: Vec<String>,
}

/// Index every recognized source file under `root` into `repository_id`,
/// skipping entirely if `root`'s current commit matches the repository's
/// last indexed commit.
pub fn index_repository(
    storage: &Storage,
    embeddings: &dyn EmbeddingProvider,
    repository_id: &str,
    root: &Path,
    production_targets: &[String],
) -> Result<CodeIndexStats> {
    if !root.exists() {
        return Err(CodeIndexError::RepositoryNotFound(
            root.display().to_string(),
        ));
    }

    let commit = current_commit(root);
    let existing = storage.get_repository_metadata(repository_id)?;

    if let (Some(existing), Some(commit)) = (&existing, &commit) {
        if existing.last_indexed_commit.as_deref() == Some(commit.as_str()) {
            tracing::info!(repository_id, "skipping: already indexed at {commit}");
            return Ok(CodeIndexStats::default());
        }
    }

    storage.delete_code_chunks_for_repository(repository_id)?;

    let files = walk_repository(root);
    let mut stats = CodeIndexStats::default();
    let mut pending: Vec<RawChunkWithPath> = Vec::new();

    for path in &files {
        stats.files_scanned += 1;
        let Ok(content) = std::fs::read_to_string(path) else {
            stats.files_skipped_unreadable += 1;
            stats
                .errors
                .push(format!("unreadable: {}", path.display()));
            continue;
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();
        let language = detect_language(path);
        let raws = chunk_file(path, &content, language);

        for raw in raws {
            pending.push(RawChunkWithPath {
                raw,
                file_path: relative.clone(),
                language,
            });
        }
    }

    stats.chunks_created = pending.len();

    let num_batches = pending.chunks(EMBEDDING_BATCH_SIZE).count();
    for (batch_index, batch) in pending.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
        for item in batch {
            let header = build_contextual_header(item);
            let embedding_text = format!("{header}\n\n{}", item.raw.code);

            let chunk = CodeChunk {
                id: Uuid::new_v4().to_string(),
                repository_id: repository_id.to_string(),
                file_path: item.file_path.clone(),
                language: language_label(item.language).to_string(),
                function_name: item.raw.function_name.clone(),
                class_name: item.raw.class_name.clone(),
                docstring: item.raw.docstring.clone(),
                is_async: item.raw.is_async,
                code: item.raw.code.clone(),
                embedding_text: embedding_text.clone(),
                start_line: item.raw.start_line,
                end_line: item.raw.end_line,
                production_targets: production_targets.to_vec(),
                created_at: Utc::now(),
            };

            match embeddings.embed(&embedding_text) {
                Ok(vector) => {
                    storage.insert_code_chunk(&chunk, Some(&vector))?;
                    stats.chunks_embedded += 1;
                }
                Err(e) => {
                    tracing::warn!("failed to embed code chunk {}: {e}", chunk.file_path);
                    stats
                        .errors
                        .push(format!("embed failed for {}: {e}", chunk.file_path));
                    storage.insert_code_chunk(&chunk, None)?;
                    stats.chunks_embed_failed += 1;
                }
            }
        }

        if batch_index + 1 < num_batches {
            std::thread::sleep(EMBEDDING_BATCH_PAUSE);
        }
    }

    storage.upsert_repository_metadata(&RepositoryMetadata {
        repository_id: repository_id.to_string(),
        root_path: root.display().to_string(),
        last_indexed_commit: commit,
        last_indexed_at: Some(Utc::now()),
        production_targets: production_targets.to_vec(),
    })?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_by_extension() {
        assert_eq!(detect_language(Path::new("a.py")), Language::Python);
        assert_eq!(detect_language(Path::new("a.sh")), Language::Bash);
        assert_eq!(detect_language(Path::new("a.zsh")), Language::Bash);
        assert_eq!(detect_language(Path::new("a.json")), Language::Json);
        assert_eq!(detect_language(Path::new("a.yaml")), Language::Yaml);
        assert_eq!(detect_language(Path::new("a.toml")), Language::Toml);
        assert_eq!(detect_language(Path::new("a.cfg")), Language::ConfigLike);
    }

    #[test]
    fn skips_binary_extensions() {
        assert!(!is_indexable(Path::new("logo.png")));
        assert!(is_indexable(Path::new("main.rs")));
    }

    #[test]
    fn excludes_vendored_directories() {
        assert!(EXCLUDED_DIRS.contains(&"node_modules"));
        assert!(EXCLUDED_DIRS.contains(&".git"));
    }
}
