//! The closed project-tag set and its normalization rule.
//!
//! Extracted as a leaf module with no dependencies on the rest of the
//! crate, since the indexer and the context assembler both need it and
//! neither should depend on the other for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the closed set of project identifiers a session can be tagged
/// with, plus the catch-all `general` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectTag {
    Thn,
    Daas,
    Ff,
    #[serde(rename = "700B")]
    SevenHundredB,
    General,
}

impl ProjectTag {
    /// All specific (non-`general`) tags, in no particular priority order.
    pub const SPECIFIC: [ProjectTag; 4] = [
        ProjectTag::Thn,
        ProjectTag::Daas,
        ProjectTag::Ff,
        ProjectTag::SevenHundredB,
    ];

    pub fn is_general(&self) -> bool {
        matches!(self, ProjectTag::General)
    }

    /// Whether this project currently uses vector retrieval over its memory
    /// records. Resolved open question: only DAAS, never `general`.
    pub fn uses_vector_retrieval(&self) -> bool {
        matches!(self, ProjectTag::Daas)
    }

    /// Whether this project uses the code-retrieval strategy.
    pub fn is_code_project(&self) -> bool {
        matches!(self, ProjectTag::Thn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectTag::Thn => "THN",
            ProjectTag::Daas => "DAAS",
            ProjectTag::Ff => "FF",
            ProjectTag::SevenHundredB => "700B",
            ProjectTag::General => "general",
        }
    }
}

impl fmt::Display for ProjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectTag {
    type Err = std::convert::Infallible;

    /// Parsing a string always succeeds — unrecognized input normalizes to
    /// `general` rather than failing, matching the wire contract in full.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize_project_tag(s))
    }
}

/// Normalize arbitrary caller-supplied text into a member of the closed
/// project-tag set.
///
/// 1. Trim whitespace, uppercase.
/// 2. If the uppercased value is one of `THN`/`DAAS`/`FF`/`700B`, return it.
/// 3. Otherwise return `general`.
pub fn normalize_project_tag(tag: &str) -> ProjectTag {
    match tag.trim().to_uppercase().as_str() {
        "THN" => ProjectTag::Thn,
        "DAAS" => ProjectTag::Daas,
        "FF" => ProjectTag::Ff,
        "700B" => ProjectTag::SevenHundredB,
        _ => ProjectTag::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_project_tag("  thn "), ProjectTag::Thn);
        assert_eq!(normalize_project_tag("Daas"), ProjectTag::Daas);
        assert_eq!(normalize_project_tag("700b"), ProjectTag::SevenHundredB);
    }

    #[test]
    fn unknown_tags_fall_back_to_general() {
        assert_eq!(normalize_project_tag("nonsense"), ProjectTag::General);
        assert_eq!(normalize_project_tag(""), ProjectTag::General);
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["THN", "daas", "FF", "700B", "whatever", ""] {
            let once = normalize_project_tag(input);
            let twice = normalize_project_tag(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn only_daas_uses_vector_retrieval() {
        for tag in ProjectTag::SPECIFIC {
            assert_eq!(tag.uses_vector_retrieval(), tag == ProjectTag::Daas);
        }
        assert!(!ProjectTag::General.uses_vector_retrieval());
    }
}
