//! Generic keyword-scored retrieval: the default strategy for any project
//! that isn't DAAS or a code project.

use crate::error::RetrievalError;
use crate::memory::MemoryRecord;
use crate::project::ProjectTag;
use crate::retrieval::Retrieval;
use crate::storage::Storage;

type Result<T> = std::result::Result<T, RetrievalError>;

const LIMIT_MEMORIES: usize = 200;
const TOP_N: usize = 5;

/// Retrieve recent memories for `project_tag`, ranked by how many tokens of
/// `user_message` appear as substrings of the record's tags/topics/summary.
pub fn retrieve(storage: &Storage, project_tag: ProjectTag, user_message: &str) -> Result<Retrieval> {
    let tokens = tokenize(user_message);
    if tokens.is_empty() {
        return Ok(Retrieval::Empty);
    }

    let candidates = storage.list_recent_memories(project_tag, LIMIT_MEMORIES)?;
    if candidates.is_empty() {
        return Ok(Retrieval::Empty);
    }

    let mut scored: Vec<(MemoryRecord, usize)> = candidates
        .into_iter()
        .map(|record| {
            let score = score_record(&record, &tokens);
            (record, score)
        })
        .collect();

    scored.sort_by(|(a_rec, a_score), (b_rec, b_score)| {
        b_score
            .cmp(a_score)
            .then_with(|| b_rec.indexed_at.cmp(&a_rec.indexed_at))
    });

    let top: Vec<MemoryRecord> = scored
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .take(TOP_N)
        .map(|(record, _)| record)
        .collect();

    if top.is_empty() {
        Ok(Retrieval::Empty)
    } else {
        Ok(Retrieval::Generic(top))
    }
}

fn tokenize(user_message: &str) -> Vec<String> {
    user_message
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

fn score_record(record: &MemoryRecord, tokens: &[String]) -> usize {
    let haystack = format!(
        "{} {} {}",
        record.tags.join(" "),
        record.key_topics.join(" "),
        record.summary_detailed
    )
    .to_lowercase();

    tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count()
}
