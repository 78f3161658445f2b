//! Recursive separator-based text splitting with overlap.
//!
//! The splitter works in two passes. First the input is segmented
//! recursively: each delimiter level splits the text with a regex, and any
//! piece still larger than the chunk size is handed to the next, finer
//! delimiter, down to a raw character cut. Second, the segments are packed
//! greedily into chunks of at most `chunk_size` bytes, and every chunk
//! after the first starts with the last `overlap` bytes of its predecessor
//! so that no statement is stranded on a chunk boundary.
//!
//! All sizes are measured in bytes, but cuts are always adjusted to UTF-8
//! character boundaries, so multi-byte text (the corpus is German) is never
//! sliced mid-code-point.

use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// Delimiter patterns tried from coarsest to finest: paragraph breaks,
/// line breaks, then single spaces.
pub const DEFAULT_TEXT_DELIMITERS: &[&str] = &[r"\n\n", r"\n", r" "];

/// A single chunk of source text, tagged with its origin and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Identifier of the document this chunk came from (usually a path).
    pub source: String,
    /// 0-indexed position of this chunk within its document.
    pub sequence: usize,
    /// The chunk text, including the overlap carried from the previous chunk.
    pub text: String,
}

/// Splits document text into overlapping chunks.
///
/// Construction compiles the delimiter cascade once; a splitter is cheap to
/// keep around and reuse across documents. Splitting is deterministic:
/// identical input and parameters always produce identical chunks.
pub struct TextSplitter {
    delimiters: Vec<Regex>,
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter with the default delimiter cascade.
    ///
    /// # Panics
    ///
    /// Panics unless `0 < chunk_size` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self::with_delimiters(chunk_size, overlap, DEFAULT_TEXT_DELIMITERS)
    }

    /// Create a splitter with a custom delimiter cascade, ordered from most
    /// to least significant.
    ///
    /// # Panics
    ///
    /// Panics unless `0 < chunk_size` and `overlap < chunk_size`, or if any
    /// delimiter pattern is not a valid regex.
    pub fn with_delimiters(chunk_size: usize, overlap: usize, patterns: &[&str]) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(
            overlap < chunk_size,
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        );

        let delimiters = patterns
            .iter()
            .map(|&pattern| Regex::new(pattern).expect("invalid delimiter pattern"))
            .collect();

        TextSplitter {
            delimiters,
            chunk_size,
            overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `content` into chunks, tagging each with `source` and its
    /// sequence number.
    ///
    /// Every chunk satisfies `0 < text.len() <= chunk_size + overlap`:
    /// the packed segments stay within `chunk_size` and the carried prefix
    /// is at most `overlap` bytes. Empty input produces no chunks.
    pub fn split(&self, source: &str, content: &str) -> Vec<TextChunk> {
        let segments = self.segment(content, 0, 0);

        let mut chunks: Vec<TextChunk> = Vec::new();
        // `current` holds the carried overlap plus the segments packed so
        // far; `packed` counts only the packed bytes, which is what the
        // chunk_size limit applies to.
        let mut current = String::new();
        let mut packed = 0usize;

        for range in segments {
            let segment = &content[range];
            if packed > 0 && packed + segment.len() > self.chunk_size {
                let tail = overlap_tail(&current, self.overlap);
                chunks.push(TextChunk {
                    source: source.to_string(),
                    sequence: chunks.len(),
                    text: std::mem::replace(&mut current, tail),
                });
                packed = 0;
            }
            current.push_str(segment);
            packed += segment.len();
        }

        if packed > 0 {
            chunks.push(TextChunk {
                source: source.to_string(),
                sequence: chunks.len(),
                text: current,
            });
        }

        chunks
    }

    // Recursively splits `text` into byte ranges (relative to the original
    // content via `offset`), none longer than chunk_size. Delimiters are
    // kept as their own segments so packing preserves the input verbatim.
    fn segment(&self, text: &str, delimiter_idx: usize, offset: usize) -> Vec<Range<usize>> {
        let mut segments: Vec<Range<usize>> = Vec::new();

        if text.is_empty() {
            return segments;
        }

        if text.len() <= self.chunk_size {
            segments.push(offset..offset + text.len());
            return segments;
        }

        // All delimiters exhausted: cut at chunk_size, nudged onto a
        // character boundary.
        if delimiter_idx >= self.delimiters.len() {
            let mut start = 0;
            while start < text.len() {
                let mut end = (start + self.chunk_size).min(text.len());
                while end > start && !text.is_char_boundary(end) {
                    end -= 1;
                }
                if end == start {
                    // chunk_size is smaller than one code point; take it whole.
                    end = start + 1;
                    while end < text.len() && !text.is_char_boundary(end) {
                        end += 1;
                    }
                }
                segments.push(offset + start..offset + end);
                start = end;
            }
            return segments;
        }

        let delimiter = &self.delimiters[delimiter_idx];
        let mut cursor = 0;

        for found in delimiter.find_iter(text) {
            if found.start() > cursor {
                segments.extend(self.segment(
                    &text[cursor..found.start()],
                    delimiter_idx + 1,
                    offset + cursor,
                ));
            }
            segments.push(offset + found.start()..offset + found.end());
            cursor = found.end();
        }

        if cursor < text.len() {
            segments.extend(self.segment(&text[cursor..], delimiter_idx + 1, offset + cursor));
        }

        segments
    }
}

// Last `overlap` bytes of `chunk`, moved forward to a character boundary so
// the tail is never longer than `overlap` and never splits a code point.
fn overlap_tail(chunk: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let mut start = chunk.len().saturating_sub(overlap);
    while start < chunk.len() && !chunk.is_char_boundary(start) {
        start += 1;
    }
    chunk[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_a_single_chunk() {
        let splitter = TextSplitter::new(500, 50);
        let chunks = splitter.split("hotel.txt", "Check-in ab 14:00 Uhr.");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "hotel.txt");
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[0].text, "Check-in ab 14:00 Uhr.");
    }

    #[test]
    fn empty_content_produces_no_chunks() {
        let splitter = TextSplitter::new(500, 50);
        assert!(splitter.split("empty.txt", "").is_empty());
    }

    #[test]
    fn chunk_length_never_exceeds_size_plus_overlap() {
        let splitter = TextSplitter::new(100, 20);
        let content = "This is a test sentence. ".repeat(50);
        let chunks = splitter.split("long.txt", &content);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(
                chunk.text.len() <= 100 + 20,
                "chunk of {} bytes exceeds the limit",
                chunk.text.len()
            );
        }
    }

    #[test]
    fn adjacent_chunks_share_the_overlap() {
        let splitter = TextSplitter::new(100, 20);
        let content = "word ".repeat(200);
        let chunks = splitter.split("long.txt", &content);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let previous = &pair[0].text;
            let tail = &previous[previous.len() - 20..];
            assert!(
                pair[1].text.starts_with(tail),
                "chunk {} does not start with the previous chunk's tail",
                pair[1].sequence
            );
        }
    }

    #[test]
    fn sequences_are_consecutive() {
        let splitter = TextSplitter::new(80, 10);
        let content = "Paragraph one.\n\nParagraph two.\n\nParagraph three.".repeat(10);
        let chunks = splitter.split("doc.md", &content);

        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence, position);
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let splitter = TextSplitter::new(90, 15);
        let content = "Zimmer mit Frühstück.\nParkplätze vorhanden.\n\n".repeat(20);

        let first = splitter.split("haus.txt", &content);
        let second = splitter.split("haus.txt", &content);
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_text_is_never_cut_inside_a_code_point() {
        // No spaces or newlines, so the character-cut fallback must engage.
        let splitter = TextSplitter::new(10, 3);
        let content = "äöüß".repeat(30);
        let chunks = splitter.split("umlaut.txt", &content);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // Slicing in split() would already have panicked on a bad
            // boundary; also check the invariant explicitly.
            assert!(chunk.text.len() <= 10 + 3);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn zero_overlap_is_allowed() {
        let splitter = TextSplitter::new(50, 0);
        let content = "alpha beta gamma delta ".repeat(20);
        let chunks = splitter.split("plain.txt", &content);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 50);
        }
    }

    #[test]
    #[should_panic(expected = "overlap")]
    fn overlap_must_be_smaller_than_chunk_size() {
        TextSplitter::new(100, 100);
    }

    #[test]
    fn chunks_serialize_with_their_metadata() {
        let splitter = TextSplitter::new(500, 50);
        let chunks = splitter.split("hotel.txt", "WLAN ist kostenlos.");
        let encoded = serde_json::to_string(&chunks[0]).unwrap();

        assert!(encoded.contains("\"source\":\"hotel.txt\""));
        assert!(encoded.contains("\"sequence\":0"));
    }
}
