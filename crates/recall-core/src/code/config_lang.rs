//! Chunkers for structured config formats: JSON per top-level key, and a
//! whole-file chunk for YAML/TOML and other config files.

use super::lines::RawChunk;

/// One chunk per top-level key in a JSON object. Falls back to a single
/// whole-file chunk for any other top-level JSON value, or invalid JSON.
pub fn chunk_json(content: &str) -> Vec<RawChunk> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(content)
    else {
        return chunk_whole_file(content);
    };

    if map.is_empty() {
        return chunk_whole_file(content);
    }

    map.into_iter()
        .map(|(key, value)| {
            let code = serde_json::to_string_pretty(&value).unwrap_or_default();
            let line_count = code.lines().count().max(1) as u32;
            RawChunk {
                start_line: 1,
                end_line: line_count,
                code,
                function_name: None,
                class_name: None,
                docstring: Some(key),
                is_async: false,
            }
        })
        .collect()
}

/// One chunk covering the entire file — used for YAML, TOML, and other
/// config formats where splitting risks breaking cross-key references.
pub fn chunk_whole_file(content: &str) -> Vec<RawChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    let line_count = content.lines().count().max(1) as u32;
    vec![RawChunk {
        start_line: 1,
        end_line: line_count,
        code: content.to_string(),
        function_name: None,
        class_name: None,
        docstring: None,
        is_async: false,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_chunks_per_top_level_key() {
        let src = r#"{"a": 1, "b": {"nested": true}}"#;
        let chunks = chunk_json(src);
        assert_eq!(chunks.len(), 2);
        let keys: Vec<_> = chunks.iter().filter_map(|c| c.docstring.clone()).collect();
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));
    }

    #[test]
    fn invalid_json_falls_back_to_whole_file() {
        let src = "{not valid json";
        let chunks = chunk_json(src);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn whole_file_chunk_covers_everything() {
        let src = "key: value\nother: 1\n";
        let chunks = chunk_whole_file(src);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line, 2);
    }
}
