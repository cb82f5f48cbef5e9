//! Python chunker: indentation- and keyword-aware line scan.
//!
//! No Python AST crate exists in this project's dependency stack, so chunk
//! boundaries are recovered heuristically rather than via a real parser.
//! A `def`/`async def`/`class` line opens a chunk that extends until a
//! line at the same or lower indentation starts a new top-level construct,
//! or EOF. This recovers correct boundaries for well-formatted source —
//! the common case — without a parser dependency. Falls through to
//! [`super::lines::chunk_by_lines`] when indentation can't be followed
//! (e.g. tabs mixed with spaces in a way that desyncs the column count).

use super::lines::{chunk_by_lines, RawChunk};

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

fn is_def_line(trimmed: &str) -> Option<(&'static str, bool, &str)> {
    if let Some(rest) = trimmed.strip_prefix("async def ") {
        Some(("def", true, rest))
    } else if let Some(rest) = trimmed.strip_prefix("def ") {
        Some(("def", false, rest))
    } else if let Some(rest) = trimmed.strip_prefix("class ") {
        Some(("class", false, rest))
    } else {
        None
    }
}

fn extract_name(rest: &str) -> String {
    rest.split(['(', ':']).next().unwrap_or(rest).trim().to_string()
}

/// First line of a triple-quoted docstring immediately following a
/// signature, if present — only the opening line is captured, matching
/// the heuristic's "recover boundaries, not full semantics" scope.
fn docstring_after(lines: &[&str], sig_index: usize) -> Option<String> {
    let next = lines.get(sig_index + 1)?.trim();
    for quote in ["\"\"\"", "'''"] {
        if let Some(rest) = next.strip_prefix(quote) {
            let body = rest.strip_suffix(quote).unwrap_or(rest);
            return Some(body.trim().to_string());
        }
    }
    None
}

pub fn chunk_python(content: &str) -> Vec<RawChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut i = 0usize;
    let mut saw_any_def = false;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        let indent = indent_width(line);

        let Some((kind, is_async, rest)) = is_def_line(trimmed) else {
            i += 1;
            continue;
        };
        saw_any_def = true;

        let name = extract_name(rest);
        let start = i;
        let mut end = i;

        let mut j = i + 1;
        while j < lines.len() {
            let candidate = lines[j];
            if candidate.trim().is_empty() {
                end = j;
                j += 1;
                continue;
            }
            let candidate_indent = indent_width(candidate);
            if candidate_indent <= indent && is_def_line(candidate.trim_start()).is_some() {
                break;
            }
            if candidate_indent <= indent && !candidate.trim_start().starts_with('#') {
                // Any other top-level statement at or below this def's
                // indentation also ends the chunk.
                if candidate_indent == 0 && indent == 0 {
                    break;
                }
            }
            end = j;
            j += 1;
        }

        let docstring = docstring_after(&lines, start);
        let code = lines[start..=end].join("\n");

        chunks.push(RawChunk {
            start_line: (start + 1) as u32,
            end_line: (end + 1) as u32,
            code,
            function_name: (kind == "def").then(|| name.clone()),
            class_name: (kind == "class").then_some(name),
            docstring,
            is_async,
        });

        i = j.max(start + 1);
    }

    if !saw_any_def {
        return chunk_by_lines(content);
    }

    chunks
}
