//! Text chunking for the concierge retrieval pipeline.
//!
//! This crate turns raw document text into overlapping, bounded-length
//! chunks suitable for embedding and nearest-neighbor retrieval. Splitting
//! is recursive and separator-based: paragraph breaks are preferred over
//! line breaks, line breaks over spaces, and a raw character cut is the
//! last resort, so chunk boundaries land on the most natural seam that
//! still respects the size limit.
//!
//! ```
//! use concierge_ai_context::TextSplitter;
//!
//! let splitter = TextSplitter::new(700, 120);
//! let chunks = splitter.split("guide.txt", "Check-in ab 14:00 Uhr.");
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].sequence, 0);
//! ```

pub mod text;

pub use text::{DEFAULT_TEXT_DELIMITERS, TextChunk, TextSplitter};
