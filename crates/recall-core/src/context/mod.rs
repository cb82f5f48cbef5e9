//! Context Assembler (C7)
//!
//! Given `(project_tag, user_message)`, dispatches to a retrieval strategy
//! (C6), gathers durable project knowledge and optional external notes, and
//! renders a single system-role context block. Never raises — every
//! failure mode degrades to a smaller, still-useful context. Also exposes
//! `build_system_prompt`, a separate path used at conversation start rather
//! than at every turn.

use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::memory::{CodeChunk, MemoryRecord, ProjectKnowledge};
use crate::project::ProjectTag;
use crate::retrieval::{self, Retrieval};
use crate::storage::Storage;

const FALLBACK_BASE_PROMPT: &str = "You are a helpful assistant with access to the user's project memory.";

const TRAILING_GUIDANCE: &str = "Use the context above when it's relevant to the user's message; \
don't mention that you were given it, and don't invent details the context doesn't support.";

const MAX_NOTES: usize = 10;

const BUDGET_TOTAL_MS: u128 = 500;
const BUDGET_EMBED_MS: u128 = 200;
const BUDGET_QUERY_MS: u128 = 200;
const BUDGET_FORMAT_MS: u128 = 100;

/// A collaborator supplying a handful of project-scoped external notes.
/// This crate ships no production implementation — the note-repository
/// synchronizer lives outside this system — so `None` and any `Err` from a
/// caller-supplied implementation are both treated as "no notes available."
pub trait NoteSource: Send + Sync {
    fn fetch_notes(
        &self,
        project_tag: ProjectTag,
        user_message: &str,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Output of a RAG-assembly call: the rendered context plus short
/// provenance strings, one per retrieved item, capped at 10.
#[derive(Debug, Clone, Default)]
pub struct ContextResult {
    pub context: String,
    pub notes: Vec<String>,
}

impl ContextResult {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Everything the RAG-assembly path needs to run one retrieval pass.
pub struct AssembleRequest<'a> {
    pub project_tag: ProjectTag,
    pub user_message: &'a str,
    pub config: &'a Config,
    pub embeddings: Option<&'a dyn EmbeddingProvider>,
    pub repository_filter: Option<&'a [String]>,
    pub production_filter: Option<&'a str>,
    pub notes: Option<&'a dyn NoteSource>,
}

/// Assemble the system-role context for one user turn.
pub fn assemble_context(storage: &Storage, request: AssembleRequest<'_>) -> ContextResult {
    let started = Instant::now();

    let retrieval_result = dispatch_retrieval(storage, &request);
    let after_retrieval = started.elapsed();

    let knowledge = storage
        .get_project_knowledge(request.project_tag)
        .unwrap_or_else(|e| {
            tracing::warn!("failed to load project knowledge: {e}");
            None
        });

    let external_notes = request
        .notes
        .and_then(|source| match source.fetch_notes(request.project_tag, request.user_message) {
            Ok(notes) => Some(notes),
            Err(e) => {
                tracing::warn!("note source failed, treating as no notes: {e}");
                None
            }
        })
        .unwrap_or_default();

    if retrieval_result.is_empty() && knowledge.is_none() && external_notes.is_empty() {
        return ContextResult::empty();
    }

    let result = render_context(&retrieval_result, knowledge.as_ref(), &external_notes);
    let total = started.elapsed();

    if after_retrieval.as_millis() > BUDGET_EMBED_MS + BUDGET_QUERY_MS {
        tracing::warn!(
            elapsed_ms = after_retrieval.as_millis() as u64,
            "retrieval exceeded its combined embed+query budget"
        );
    }
    let format_ms = total.saturating_sub(after_retrieval).as_millis();
    if format_ms > BUDGET_FORMAT_MS {
        tracing::warn!(elapsed_ms = format_ms as u64, "context formatting exceeded its budget");
    }
    if total.as_millis() > BUDGET_TOTAL_MS {
        tracing::warn!(
            elapsed_ms = total.as_millis() as u64,
            "context assembly exceeded the 500ms latency budget"
        );
    }

    result
}

/// Dispatch to the appropriate strategy, catching every error and
/// degrading to `Retrieval::Empty` rather than propagating — equivalent to
/// "fall back to generic" for projects whose normal strategy already is
/// generic, and to "project-knowledge-only" for DAAS/code.
fn dispatch_retrieval(storage: &Storage, request: &AssembleRequest<'_>) -> Retrieval {
    let outcome = match request.project_tag {
        ProjectTag::Daas => request
            .embeddings
            .map(|embeddings| {
                retrieval::daas::retrieve(
                    storage,
                    embeddings,
                    request.user_message,
                    request.config.daas_vector_top_k,
                )
            })
            .unwrap_or(Ok(Retrieval::Empty)),
        tag if tag.is_code_project() => request
            .embeddings
            .map(|embeddings| {
                retrieval::code_retrieval::retrieve(
                    storage,
                    embeddings,
                    request.user_message,
                    request.config.daas_vector_top_k,
                    request.repository_filter,
                    request.production_filter,
                )
            })
            .unwrap_or(Ok(Retrieval::Empty)),
        tag => retrieval::generic::retrieve(storage, tag, request.user_message),
    };

    match outcome {
        Ok(retrieval) => retrieval,
        Err(e) => {
            tracing::warn!("retrieval strategy failed, degrading to empty: {e}");
            Retrieval::Empty
        }
    }
}

fn render_context(
    retrieval: &Retrieval,
    knowledge: Option<&ProjectKnowledge>,
    external_notes: &[String],
) -> ContextResult {
    let mut sections = Vec::new();

    if !external_notes.is_empty() {
        let mut section = String::from("Here are some relevant notes:\n");
        for note in external_notes {
            section.push_str("- ");
            section.push_str(note);
            section.push('\n');
        }
        sections.push(section.trim_end().to_string());
    }

    if let Some(knowledge) = knowledge {
        sections.push(render_knowledge_summary(knowledge));
    }

    let mut provenance = Vec::new();
    if let Some(retrieval_section) = render_retrieval_section(retrieval, &mut provenance) {
        sections.push(retrieval_section);
    }

    if sections.is_empty() {
        return ContextResult::empty();
    }

    sections.push(TRAILING_GUIDANCE.to_string());
    provenance.truncate(MAX_NOTES);

    ContextResult {
        context: sections.join("\n\n"),
        notes: provenance,
    }
}

fn render_knowledge_summary(knowledge: &ProjectKnowledge) -> String {
    let mut out = format!("Project knowledge:\n{}", knowledge.overview.trim());
    if !knowledge.summary_list.is_empty() {
        out.push_str("\n\n");
        for (i, item) in knowledge.summary_list.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, item));
        }
    }
    out.trim_end().to_string()
}

fn render_retrieval_section(retrieval: &Retrieval, provenance: &mut Vec<String>) -> Option<String> {
    match retrieval {
        Retrieval::SingleDream(record) => {
            provenance.push(format!("{} (indexed {})", record.title, record.indexed_at.to_rfc3339()));
            Some(format!(
                "Here is the specific dream you asked about:\n\n{}",
                render_memory_record(record)
            ))
        }
        Retrieval::NoTitleMatch => Some(
            "No dream matched that title. Ask again without quotes to search by pattern instead."
                .to_string(),
        ),
        Retrieval::PatternDreams(hits) => {
            if hits.is_empty() {
                return None;
            }
            let mut body = String::from("Here are relevant dreams from your dream history:\n\n");
            for (record, similarity) in hits {
                provenance.push(format!(
                    "{} (similarity {:.2}, indexed {})",
                    record.title,
                    similarity,
                    record.indexed_at.to_rfc3339()
                ));
                body.push_str(&render_memory_record(record));
                body.push('\n');
            }
            Some(body.trim_end().to_string())
        }
        Retrieval::Code(hits) => {
            if hits.is_empty() {
                return None;
            }
            let mut body = String::from("Here is relevant code from the repository:\n\n");
            for (chunk, similarity) in hits {
                provenance.push(format!(
                    "{} ({}, similarity {:.2})",
                    chunk.file_path, chunk.repository_id, similarity
                ));
                body.push_str(&render_code_chunk(chunk));
                body.push('\n');
            }
            Some(body.trim_end().to_string())
        }
        Retrieval::Generic(records) => {
            if records.is_empty() {
                return None;
            }
            let mut body =
                String::from("Here are relevant memories from past conversations in this project:\n\n");
            for record in records {
                provenance.push(format!("{} (indexed {})", record.title, record.indexed_at.to_rfc3339()));
                body.push_str(&render_memory_record(record));
                body.push('\n');
            }
            Some(body.trim_end().to_string())
        }
        Retrieval::Empty => None,
    }
}

fn render_memory_record(record: &MemoryRecord) -> String {
    format!("- {}: {}", record.title, record.summary_short)
}

fn render_code_chunk(chunk: &CodeChunk) -> String {
    match &chunk.function_name {
        Some(name) => format!("- {} ({})", chunk.file_path, name),
        None => format!("- {}", chunk.file_path),
    }
}

/// Base system prompt, loaded once and cached for the process lifetime.
fn base_prompt() -> &'static str {
    static CACHE: OnceLock<String> = OnceLock::new();
    CACHE.get_or_init(load_base_prompt)
}

fn load_base_prompt() -> String {
    let path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("resources/base_system_prompt.txt")));

    path.and_then(|p| std::fs::read_to_string(p).ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_BASE_PROMPT.to_string())
}

fn rule_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\.\s*(.+)$").unwrap())
}

/// Parse `rules` into an ordered list, preferring the `N. text` numbered
/// form and falling back to one rule per non-empty line.
fn parse_rules(rules: &str) -> Vec<String> {
    let re = rule_line_regex();
    let numbered: Vec<String> = rules
        .lines()
        .filter_map(|line| re.captures(line).map(|c| c[1].trim().to_string()))
        .collect();

    if !numbered.is_empty() {
        return numbered;
    }

    rules
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the separate system-prompt path: the base prompt plus, if the
/// project is specific, a declaration sentence, the project's overview
/// verbatim, and a numbered rules list.
pub fn build_system_prompt(storage: &Storage, project_tag: ProjectTag) -> String {
    let mut out = base_prompt().to_string();

    if project_tag.is_general() {
        return out;
    }

    let knowledge = storage.get_project_knowledge(project_tag).unwrap_or_else(|e| {
        tracing::warn!("failed to load project knowledge for system prompt: {e}");
        None
    });

    let Some(knowledge) = knowledge else {
        out.push_str(&format!("\n\nThis conversation is about the project {project_tag}."));
        return out;
    };

    out.push_str(&format!("\n\nThis conversation is about the project {project_tag}."));
    out.push_str("\n\n");
    out.push_str(knowledge.overview.trim());

    let rules = parse_rules(&knowledge.rules);
    if !rules.is_empty() {
        out.push_str("\n\n---\n");
        for (i, rule) in rules.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rule));
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_rules() {
        let rules = "1. Be concise\n2. Cite sources\n3. No speculation";
        let parsed = parse_rules(rules);
        assert_eq!(parsed, vec!["Be concise", "Cite sources", "No speculation"]);
    }

    #[test]
    fn falls_back_to_one_rule_per_line() {
        let rules = "Be concise\nCite sources\n\n";
        let parsed = parse_rules(rules);
        assert_eq!(parsed, vec!["Be concise", "Cite sources"]);
    }

    #[test]
    fn general_project_gets_bare_base_prompt() {
        let storage = Storage::open_in_memory().unwrap();
        let prompt = build_system_prompt(&storage, ProjectTag::General);
        assert_eq!(prompt, FALLBACK_BASE_PROMPT);
    }

    #[test]
    fn empty_everything_yields_empty_result() {
        let result = render_context(&Retrieval::Empty, None, &[]);
        assert!(result.is_empty());
        assert!(result.notes.is_empty());
    }

    #[test]
    fn provenance_capped_at_ten() {
        use crate::memory::KeyEntities;
        use chrono::Utc;

        let hits: Vec<(MemoryRecord, f32)> = (0..20)
            .map(|i| {
                (
                    MemoryRecord {
                        session_id: format!("s{i}"),
                        project_tag: ProjectTag::Daas,
                        title: format!("dream {i}"),
                        summary_short: "s".into(),
                        summary_detailed: "d".into(),
                        memory_snippet: "m".into(),
                        tags: vec![],
                        key_topics: vec![],
                        key_entities: KeyEntities::default(),
                        indexer_model: "llama3.1".into(),
                        version: 1,
                        indexed_at: Utc::now(),
                    },
                    0.9,
                )
            })
            .collect();

        let result = render_context(&Retrieval::PatternDreams(hits), None, &[]);
        assert_eq!(result.notes.len(), MAX_NOTES);
    }
}
