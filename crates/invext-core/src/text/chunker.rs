//! Splitting document text into bounded chunks for the extraction backend.

use serde::Serialize;
use tracing::debug;

use crate::models::document::Document;

/// A contiguous slice of the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Position in the chunk sequence (0-indexed).
    pub index: usize,
    /// Chunk text, never empty.
    pub text: String,
}

impl TextChunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Chunks are contiguous and concatenate back to `text`. Each boundary sits
/// right after the last whitespace inside the window; a whitespace-free run
/// longer than the window is cut at the limit. Empty text yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let limit = start + max_chars;
        let end = if limit >= total {
            total
        } else {
            split_point(text, &offsets, start, limit)
        };

        chunks.push(TextChunk {
            index: chunks.len(),
            text: text[offsets[start]..offsets[end]].to_string(),
        });
        start = end;
    }

    chunks
}

/// Char index to end the chunk starting at `start`, with `limit < total`.
fn split_point(text: &str, offsets: &[usize], start: usize, limit: usize) -> usize {
    let char_at = |i: usize| text[offsets[i]..].chars().next();

    if char_at(limit).is_some_and(char::is_whitespace) {
        return limit;
    }

    (start..limit)
        .rev()
        .find(|&i| char_at(i).is_some_and(char::is_whitespace))
        .map(|i| i + 1)
        .unwrap_or(limit)
}

/// Concatenate a document with page markers and chunk it.
///
/// A blank document yields no chunks.
pub fn chunk_document(document: &Document, max_chars: usize) -> Vec<TextChunk> {
    let full_text = document.full_text();
    let chunks = chunk_text(&full_text, max_chars);
    debug!(
        "Split {} chars into {} chunks (max {})",
        full_text.chars().count(),
        chunks.len(),
        max_chars
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::Page;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Invoice INV-001", 100);
        assert_eq!(texts(&chunks), vec!["Invoice INV-001"]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_splits_after_last_whitespace() {
        let chunks = chunk_text("alpha beta gamma", 12);
        assert_eq!(texts(&chunks), vec!["alpha beta ", "gamma"]);
    }

    #[test]
    fn test_whitespace_at_limit_cuts_at_limit() {
        let chunks = chunk_text("alpha beta gamma", 10);
        assert_eq!(texts(&chunks), vec!["alpha beta", " gamma"]);
    }

    #[test]
    fn test_long_word_is_hard_split() {
        let chunks = chunk_text("abcdefghij klm", 4);
        assert_eq!(texts(&chunks), vec!["abcd", "efgh", "ij ", "klm"]);
    }

    #[test]
    fn test_limits_count_chars_not_bytes() {
        let chunks = chunk_text("żółć gęś", 5);
        assert_eq!(texts(&chunks), vec!["żółć ", "gęś"]);
        assert!(chunks.iter().all(|c| c.char_len() <= 5));
    }

    #[test]
    fn test_indices_are_sequential() {
        let chunks = chunk_text("one two three four five six", 8);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_blank_document_has_no_chunks() {
        let doc = Document::new(vec![Page::layer(1, " "), Page::layer(2, "\n")]);
        assert!(chunk_document(&doc, 8000).is_empty());
    }

    #[test]
    fn test_document_chunks_carry_page_markers() {
        let doc = Document::new(vec![Page::layer(1, "Acme Corp"), Page::layer(2, "INV-001")]);
        let chunks = chunk_document(&doc, 8000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("===== Page 1 =====\nAcme Corp"));
        assert!(chunks[0].text.contains("===== Page 2 =====\nINV-001"));
    }

    proptest! {
        #[test]
        fn prop_chunks_reassemble_exactly(text in "[a-zé \n\t]{0,300}", max in 1usize..40) {
            let chunks = chunk_text(&text, max);
            let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
            prop_assert_eq!(joined, text);
        }

        #[test]
        fn prop_chunks_are_bounded_and_non_empty(text in "[a-zé \n]{0,300}", max in 1usize..40) {
            for chunk in chunk_text(&text, max) {
                prop_assert!(!chunk.text.is_empty());
                prop_assert!(chunk.char_len() <= max);
            }
        }

        #[test]
        fn prop_no_mid_word_split_when_words_fit(
            words in proptest::collection::vec("[a-z]{1,8}", 0..60),
            max in 8usize..40,
        ) {
            let text = words.join(" ");
            let chunks = chunk_text(&text, max);
            for pair in chunks.windows(2) {
                let left = pair[0].text.chars().last();
                let right = pair[1].text.chars().next();
                prop_assert!(
                    left.is_some_and(char::is_whitespace) || right.is_some_and(char::is_whitespace)
                );
            }
        }
    }
}
