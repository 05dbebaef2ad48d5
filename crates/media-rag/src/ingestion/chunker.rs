//! Text chunking with boundary-seeking splits and fixed overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{Chunk, Metadata, NormalizedDocument};

/// Text chunker with configurable size and overlap
///
/// Splits prefer, in order, paragraph breaks, sentence boundaries, whitespace
/// and finally a hard cut. Consecutive chunks of the same document share
/// exactly `overlap` characters, so dropping the first `overlap` characters of
/// every chunk after the first and concatenating reproduces the source text.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Chunking("chunk size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Chunking(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk documents in order; `metadata` overrides same-named document keys
    pub fn chunk(&self, documents: &[NormalizedDocument], metadata: &Metadata) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            let chunk_metadata = doc.metadata.merge(metadata);
            chunks.extend(
                self.split_text(&doc.text)
                    .into_iter()
                    .map(|text| Chunk::new(text, chunk_metadata.clone())),
            );
        }
        chunks
    }

    /// Split a single text into overlapping segments
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        if total <= self.chunk_size {
            return vec![text];
        }

        let mut segments = Vec::new();
        let mut start = 0usize;

        loop {
            if total - start <= self.chunk_size {
                segments.push(&text[offsets[start]..]);
                break;
            }

            let end = self.find_break(text, &offsets, start);
            segments.push(&text[offsets[start]..offsets[end]]);
            start = end - self.overlap;
        }

        segments
    }

    /// Char index where the segment starting at `start` should end
    fn find_break(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let window_end = start + self.chunk_size;
        let base = offsets[start];
        let window = &text[base..offsets[window_end]];
        // Every segment must advance past the overlap it will hand on
        let min_end = start + self.overlap + 1;

        let to_char = |byte_in_window: usize| -> usize {
            let byte = base + byte_in_window;
            offsets.binary_search(&byte).unwrap_or_else(|i| i)
        };

        let candidates = [
            paragraph_break(window),
            sentence_break(window),
            whitespace_break(window),
        ];

        candidates
            .into_iter()
            .flatten()
            .map(to_char)
            .find(|&end| end >= min_end && end <= window_end)
            .unwrap_or(window_end)
    }
}

/// Byte offset just past the last blank line in `window`
fn paragraph_break(window: &str) -> Option<usize> {
    window.rfind("\n\n").map(|i| i + 2)
}

/// Byte offset of the last sentence start in `window`
fn sentence_break(window: &str) -> Option<usize> {
    window
        .split_sentence_bound_indices()
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .last()
}

/// Byte offset just past the last whitespace character in `window`
fn whitespace_break(window: &str) -> Option<usize> {
    window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{keys, MetadataValue};

    fn reconstruct(segments: &[&str], overlap: usize) -> String {
        let mut out = String::new();
        for (i, s) in segments.iter().enumerate() {
            if i == 0 {
                out.push_str(s);
            } else {
                out.extend(s.chars().skip(overlap));
            }
        }
        out
    }

    fn assert_overlap(segments: &[&str], overlap: usize) {
        for pair in segments.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].chars().collect();
                chars[chars.len() - overlap..].iter().collect()
            };
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_rejects_invalid_settings() {
        assert!(matches!(TextChunker::new(0, 0), Err(Error::Chunking(_))));
        assert!(matches!(TextChunker::new(100, 100), Err(Error::Chunking(_))));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_and_whitespace_produce_nothing() {
        let chunker = TextChunker::new(700, 50).unwrap();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(700, 50).unwrap();
        let text = "x".repeat(700);
        assert_eq!(chunker.split_text(&text), vec![text.as_str()]);
    }

    #[test]
    fn test_word_split_positions() {
        let chunker = TextChunker::new(700, 50).unwrap();
        let text = "abcd ".repeat(300);
        let segments = chunker.split_text(&text);

        let lens: Vec<usize> = segments.iter().map(|s| s.chars().count()).collect();
        assert_eq!(lens, vec![700, 700, 200]);
        assert_overlap(&segments, 50);
        assert_eq!(reconstruct(&segments, 50), text);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = TextChunker::new(100, 10).unwrap();
        let first = format!("{}.\n\n", "a".repeat(60));
        let text = format!("{}{}", first, "b ".repeat(50));
        let segments = chunker.split_text(&text);

        assert_eq!(segments[0], first);
        assert_overlap(&segments, 10);
        assert_eq!(reconstruct(&segments, 10), text);
    }

    #[test]
    fn test_prefers_sentences_over_words() {
        let chunker = TextChunker::new(60, 5).unwrap();
        let text = "The first sentence is here. The second one runs quite a bit longer than that.";
        let segments = chunker.split_text(text);

        assert_eq!(segments[0], "The first sentence is here. ");
        assert_eq!(reconstruct(&segments, 5), text);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let text = "z".repeat(250);
        let segments = chunker.split_text(&text);

        assert!(segments.iter().all(|s| s.chars().count() <= 100));
        assert_overlap(&segments, 20);
        assert_eq!(reconstruct(&segments, 20), text);
    }

    #[test]
    fn test_multibyte_text_respects_char_bounds() {
        let chunker = TextChunker::new(40, 8).unwrap();
        let text = "Ação não é fácil, é preciso atenção. ".repeat(10);
        let segments = chunker.split_text(&text);

        assert!(segments.iter().all(|s| s.chars().count() <= 40));
        assert_overlap(&segments, 8);
        assert_eq!(reconstruct(&segments, 8), text);
    }

    #[test]
    fn test_chunk_metadata_lineage() {
        let chunker = TextChunker::new(700, 50).unwrap();
        let pages = vec![
            NormalizedDocument::new(
                "first page",
                Metadata::new()
                    .with(keys::PAGE, 1u32)
                    .with(keys::FILENAME, "tmpab12.pdf"),
            ),
            NormalizedDocument::new("   ", Metadata::new().with(keys::PAGE, 2u32)),
            NormalizedDocument::new("third page", Metadata::new().with(keys::PAGE, 3u32)),
        ];
        let external = Metadata::new()
            .with(keys::FILENAME, "manual.pdf")
            .with(keys::FILE_TYPE, "pdf");

        let chunks = chunker.chunk(&pages, &external);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "first page");
        assert_eq!(chunks[1].text, "third page");
        for chunk in &chunks {
            assert!(chunk.metadata.is_superset_of(&external));
        }
        assert_eq!(chunks[0].metadata.get_str(keys::FILENAME), Some("manual.pdf"));
        assert_eq!(chunks[1].metadata.get(keys::PAGE), Some(&MetadataValue::Integer(3)));
    }
}
