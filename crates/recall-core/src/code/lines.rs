//! Generic fallback chunker: fixed-size, non-overlapping line windows.
//!
//! Used for any file whose language isn't otherwise recognized, and as the
//! fallback when a language-specific chunker can't make sense of a file.

pub const WINDOW_LINES: usize = 100;

/// A raw chunk before it's turned into a [`crate::memory::CodeChunk`] —
/// just the line range and the code text.
pub struct RawChunk {
    pub start_line: u32,
    pub end_line: u32,
    pub code: String,
    pub function_name: Option<String>,
    pub class_name: Option<String>,
    pub docstring: Option<String>,
    pub is_async: bool,
}

pub fn chunk_by_lines(content: &str) -> Vec<RawChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    lines
        .chunks(WINDOW_LINES)
        .enumerate()
        .map(|(i, window)| RawChunk {
            start_line: (i * WINDOW_LINES) as u32 + 1,
            end_line: (i * WINDOW_LINES + window.len()) as u32,
            code: window.join("\n"),
            function_name: None,
            class_name: None,
            docstring: None,
            is_async: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_window_size() {
        let content = (0..250).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = chunk_by_lines(&content);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 100);
        assert_eq!(chunks[2].start_line, 201);
        assert_eq!(chunks[2].end_line, 250);
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(chunk_by_lines("").is_empty());
    }
}
