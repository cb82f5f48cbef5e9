//! Retrieval Strategies (C6)
//!
//! Per-project dispatch over the memory store: DAAS gets quoted-title or
//! vector-pattern dream retrieval, code projects get vector-topK over code
//! chunks, everything else gets keyword-scored recent memories. All three
//! tolerate empty input and an empty store — retrieval never fails the
//! caller, it returns [`Retrieval::Empty`].

pub mod code_retrieval;
pub mod daas;
pub mod generic;

use crate::memory::{CodeChunk, MemoryRecord};
use crate::project::ProjectTag;

/// Tagged result of a retrieval dispatch. Replaces the loosely-typed dicts
/// the strategies would otherwise shuttle around.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// DAAS single-record mode matched exactly one title.
    SingleDream(MemoryRecord),
    /// DAAS single-record mode found a quoted title but no match — distinct
    /// from `Empty` because the assembler still owes the user a pointer to
    /// pattern mode.
    NoTitleMatch,
    /// DAAS pattern mode: vector-topK over dream memories.
    PatternDreams(Vec<(MemoryRecord, f32)>),
    /// Code-project vector-topK over indexed source chunks.
    Code(Vec<(CodeChunk, f32)>),
    /// Generic keyword-scored memories.
    Generic(Vec<MemoryRecord>),
    /// Nothing to retrieve, or the strategy isn't applicable.
    Empty,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Retrieval::Empty | Retrieval::NoTitleMatch
        ) || match self {
            Retrieval::PatternDreams(v) => v.is_empty(),
            Retrieval::Code(v) => v.is_empty(),
            Retrieval::Generic(v) => v.is_empty(),
            _ => false,
        }
    }
}

/// Strategy the dispatcher chose, recorded for observability (logged by the
/// context assembler, never the content itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    DaasSingle,
    DaasPattern,
    Code,
    Generic,
}

pub fn strategy_for(project_tag: ProjectTag) -> StrategyKind {
    if project_tag == ProjectTag::Daas {
        StrategyKind::DaasPattern
    } else if project_tag.is_code_project() {
        StrategyKind::Code
    } else {
        StrategyKind::Generic
    }
}
