//! Formatting retrieved chunks into a bounded prompt context.

use concierge_ai_retriever::RetrievedChunk;

/// Maximum snippet length in bytes before truncation.
pub const MAX_SNIPPET_LEN: usize = 900;

/// Marker appended to truncated snippets.
pub const ELLIPSIS_MARKER: &str = " ...";

/// Format retrieved chunks into a prompt context.
///
/// Each chunk is collapsed to single-spaced text, truncated to
/// [`MAX_SNIPPET_LEN`] with an ellipsis marker, and the snippets are joined
/// by blank lines in retrieval order (most relevant first). Pure function:
/// empty input yields an empty string.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| snippet(&chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() <= MAX_SNIPPET_LEN {
        return collapsed;
    }

    let mut end = MAX_SNIPPET_LEN;
    while !collapsed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &collapsed[..end], ELLIPSIS_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn empty_input_yields_an_empty_string() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn whitespace_and_newlines_collapse_to_single_spaces() {
        let chunks = vec![chunk("Check-in\nab   14:00\t\tUhr.")];
        assert_eq!(format_context(&chunks), "Check-in ab 14:00 Uhr.");
    }

    #[test]
    fn snippets_join_with_blank_lines_in_retrieval_order() {
        let chunks = vec![chunk("Erster Treffer."), chunk("Zweiter Treffer.")];
        assert_eq!(format_context(&chunks), "Erster Treffer.\n\nZweiter Treffer.");
    }

    #[test]
    fn long_snippets_are_truncated_with_a_marker() {
        let long = "a".repeat(MAX_SNIPPET_LEN + 100);
        let formatted = format_context(&[chunk(&long)]);

        assert!(formatted.ends_with(ELLIPSIS_MARKER));
        assert_eq!(formatted.len(), MAX_SNIPPET_LEN + ELLIPSIS_MARKER.len());
    }

    #[test]
    fn snippets_at_the_limit_are_not_marked() {
        let exact = "b".repeat(MAX_SNIPPET_LEN);
        let formatted = format_context(&[chunk(&exact)]);

        assert_eq!(formatted, exact);
        assert!(!formatted.ends_with(ELLIPSIS_MARKER));
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let umlauts = "ä".repeat(MAX_SNIPPET_LEN); // 2 bytes each
        let formatted = format_context(&[chunk(&umlauts)]);

        assert!(formatted.ends_with(ELLIPSIS_MARKER));
        assert!(formatted.len() <= MAX_SNIPPET_LEN + ELLIPSIS_MARKER.len());
    }
}
