//! Fixed-size text chunker.
//!
//! Splits file content into non-overlapping spans of at most `max_chars`
//! characters. Splitting is purely positional: no line, paragraph, or scope
//! awareness. Concatenating the chunks in order reproduces the input
//! exactly.

use crate::models::Chunk;

/// Split `content` into ordered chunks of at most `max_chars` characters.
///
/// Span boundaries are measured in characters, never bytes, so a split can
/// never land inside a multi-byte UTF-8 sequence. Empty content yields zero
/// chunks; the final chunk may be shorter than `max_chars`. Pure function of
/// its inputs, so chunk identities are stable across runs.
pub fn split(path: &str, content: &str, max_chars: usize) -> Vec<Chunk> {
    debug_assert!(max_chars > 0);
    if content.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut span_start = 0usize;
    let mut span_chars = 0usize;

    for (offset, _) in content.char_indices() {
        if span_chars == max_chars {
            chunks.push(make_chunk(path, chunks.len(), &content[span_start..offset]));
            span_start = offset;
            span_chars = 0;
        }
        span_chars += 1;
    }
    chunks.push(make_chunk(path, chunks.len(), &content[span_start..]));

    chunks
}

fn make_chunk(path: &str, index: usize, text: &str) -> Chunk {
    Chunk {
        path: path.to_string(),
        index,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_content_single_chunk() {
        let chunks = split("/ws/a.py", "hello", 2000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].id(), "/ws/a.py_0");
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(split("/ws/a.py", "", 2000).is_empty());
    }

    #[test]
    fn chunk_count_is_ceil_of_len_over_max() {
        for (len, max, expected) in [(1500usize, 2000usize, 1usize), (2000, 2000, 1), (2001, 2000, 2), (4000, 2000, 2), (4001, 2000, 3), (10, 3, 4)] {
            let content = "x".repeat(len);
            let chunks = split("f", &content, max);
            assert_eq!(chunks.len(), expected, "len={} max={}", len, max);
        }
    }

    #[test]
    fn round_trip_reconstructs_content() {
        let content = "The quick brown fox jumps over the lazy dog.".repeat(40);
        let chunks = split("f", &content, 100);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, content);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn splits_on_character_boundaries_not_bytes() {
        // Multi-byte characters must never be cut mid-sequence.
        let content = "héllo wörld ünïcode ".repeat(50);
        let chunks = split("f", &content, 7);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 7));
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, content);
    }

    #[test]
    fn deterministic() {
        let content = "alpha beta gamma delta".repeat(100);
        let a = split("f", &content, 64);
        let b = split("f", &content, 64);
        assert_eq!(a, b);
    }
}
