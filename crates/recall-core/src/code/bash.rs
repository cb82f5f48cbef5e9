//! Bash chunker: regex function-boundary detection with brace tracking.

use regex::Regex;
use std::sync::OnceLock;

use super::lines::{chunk_by_lines, RawChunk};

/// Matches `name()`, `function name`, and `function name()` declarations.
fn function_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:function\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\(\)\s*\{?\s*$").unwrap()
    })
}

pub fn chunk_bash(content: &str) -> Vec<RawChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut i = 0usize;
    let mut saw_any_fn = false;

    while i < lines.len() {
        let Some(caps) = function_decl_re().captures(lines[i]) else {
            i += 1;
            continue;
        };
        saw_any_fn = true;
        let name = caps.get(1).unwrap().as_str().to_string();
        let start = i;

        // Track brace depth starting from the declaration line (which may
        // or may not carry the opening brace itself) to the matching close.
        let mut depth = 0i32;
        let mut opened = false;
        let mut end = i;
        let mut j = i;
        while j < lines.len() {
            for ch in lines[j].chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            end = j;
            if opened && depth <= 0 {
                break;
            }
            j += 1;
        }

        let code = lines[start..=end].join("\n");
        chunks.push(RawChunk {
            start_line: (start + 1) as u32,
            end_line: (end + 1) as u32,
            code,
            function_name: Some(name),
            class_name: None,
            docstring: None,
            is_async: false,
        });

        i = end + 1;
    }

    if !saw_any_fn {
        return chunk_by_lines(content);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_brace_on_own_line() {
        let src = "deploy()\n{\n  echo hi\n  if true; then\n    echo nested\n  fi\n}\n";
        let chunks = chunk_bash(src);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].function_name.as_deref(), Some("deploy"));
        assert_eq!(chunks[0].end_line, 7);
    }

    #[test]
    fn chunks_function_keyword_form() {
        let src = "function build() {\n  make all\n}\n";
        let chunks = chunk_bash(src);
        assert_eq!(chunks[0].function_name.as_deref(), Some("build"));
    }

    #[test]
    fn no_functions_falls_back_to_line_windows() {
        let src = "echo one\necho two\n";
        let chunks = chunk_bash(src);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].function_name.is_none());
    }
}
