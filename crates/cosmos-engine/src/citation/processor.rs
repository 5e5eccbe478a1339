//! Citation marker processing
//!
//! Answer Service text cites its retrieval sources in-band with markers of
//! the form `[Source: <type-label> <identifier>]`. This processor rewrites
//! every marker into a numbered inline anchor, deduplicates repeat mentions
//! of the same source, and appends a source list in numeric order.

use cosmos_common::{SOURCES_HEADER, SourceType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One deduplicated source reference extracted from answer text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based number, contiguous, in first-appearance order
    pub number: u32,
    /// Kind of source the marker named
    pub source_type: SourceType,
    /// Opaque source key, matched exactly
    pub identifier: String,
    /// Human-readable label for the source list
    pub display_text: String,
}

/// Result of one processing pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedAnswer {
    /// Input text with every marker replaced by an inline anchor, plus the
    /// appended source list when any citation was found
    pub text: String,
    /// Citations in numeric order; empty when the input had no markers
    pub citations: Vec<Citation>,
}

/// Pure text transformer: raw answer text in, rewritten text and an ordered
/// citation list out.
pub struct CitationProcessor {
    marker: Regex,
}

impl CitationProcessor {
    pub fn new() -> Self {
        // Type labels are a closed, case-sensitive set; the identifier is
        // everything up to the closing bracket, trimmed. A marker without an
        // identifier does not match and is left as-is.
        let marker = Regex::new(r"\[Source:\s*(PDF document|image|url|youtube)\s+([^\]\s][^\]]*?)\s*\]")
            .expect("citation marker pattern is valid");
        Self { marker }
    }

    /// Rewrite all citation markers in `text`.
    ///
    /// Replacement is occurrence-indexed: each marker instance is resolved
    /// by its position in the scan, never by substring equality, so
    /// identical marker text at different positions is handled
    /// independently. Running the processor over its own output is a no-op
    /// because the rewritten text contains no markers.
    pub fn process(&self, text: &str) -> ProcessedAnswer {
        let mut citations: Vec<Citation> = Vec::new();
        let mut numbers: HashMap<(SourceType, String), u32> = HashMap::new();
        let mut rewritten = String::with_capacity(text.len());
        let mut last = 0;

        for captures in self.marker.captures_iter(text) {
            let whole = captures.get(0).expect("match always has group 0");
            let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let identifier = captures
                .get(2)
                .map(|m| m.as_str().trim())
                .unwrap_or_default();

            let Some(source_type) = SourceType::from_type_label(label) else {
                // The pattern only admits known labels
                continue;
            };

            let key = (source_type, identifier.to_string());
            let number = match numbers.get(&key) {
                Some(number) => *number,
                None => {
                    let number = citations.len() as u32 + 1;
                    citations.push(Citation {
                        number,
                        source_type,
                        identifier: identifier.to_string(),
                        display_text: display_text(source_type, identifier),
                    });
                    numbers.insert(key, number);
                    number
                }
            };

            rewritten.push_str(&text[last..whole.start()]);
            rewritten.push_str(&inline_anchor(number));
            last = whole.end();
        }
        rewritten.push_str(&text[last..]);

        if !citations.is_empty() {
            rewritten.push_str(&sources_block(&citations));
            debug!(
                citations = citations.len(),
                "rewrote citation markers"
            );
        }

        ProcessedAnswer {
            text: rewritten,
            citations,
        }
    }
}

impl Default for CitationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Inline reference pointing at the source list entry with the same number
fn inline_anchor(number: u32) -> String {
    format!("[[{}]](#source-{})", number, number)
}

/// Deterministic source list appended after the answer body
fn sources_block(citations: &[Citation]) -> String {
    let mut block = format!("\n\n---\n{}\n", SOURCES_HEADER);
    for citation in citations {
        block.push_str(&format!(
            "\n{}. <a id=\"source-{}\"></a>{}",
            citation.number, citation.number, citation.display_text
        ));
    }
    block
}

/// Derive the human-readable label shown in the source list
fn display_text(source_type: SourceType, identifier: &str) -> String {
    match source_type {
        SourceType::Pdf => format!("PDF document ({})", identifier),
        SourceType::Url => identifier.to_string(),
        SourceType::Youtube => format!("YouTube video ({})", identifier),
        SourceType::Image => format!("Image ({})", identifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(text: &str) -> usize {
        text.matches("[[").count()
    }

    #[test]
    fn test_single_marker() {
        let processor = CitationProcessor::new();
        let result = processor.process("The answer [Source: url wccftech.com] is here.");

        assert_eq!(result.citations.len(), 1);
        let citation = &result.citations[0];
        assert_eq!(citation.number, 1);
        assert_eq!(citation.source_type, SourceType::Url);
        assert_eq!(citation.identifier, "wccftech.com");
        assert_eq!(citation.display_text, "wccftech.com");

        assert!(result.text.starts_with("The answer [[1]](#source-1) is here."));
        assert!(result.text.contains("**Sources:**"));
        assert!(result.text.contains("<a id=\"source-1\"></a>wccftech.com"));
    }

    #[test]
    fn test_numbering_first_appearance_order_with_reuse() {
        let processor = CitationProcessor::new();
        let text = "A [Source: url abc123] B [Source: PDF document def456] C [Source: url abc123] D";
        let result = processor.process(text);

        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[0].number, 1);
        assert_eq!(result.citations[0].source_type, SourceType::Url);
        assert_eq!(result.citations[0].identifier, "abc123");
        assert_eq!(result.citations[1].number, 2);
        assert_eq!(result.citations[1].source_type, SourceType::Pdf);
        assert_eq!(result.citations[1].identifier, "def456");

        // Three marker occurrences become three anchors, the repeat reusing
        // number 1
        assert_eq!(anchors(&result.text), 3);
        assert!(
            result
                .text
                .starts_with("A [[1]](#source-1) B [[2]](#source-2) C [[1]](#source-1) D")
        );
    }

    #[test]
    fn test_same_identifier_different_types_are_distinct() {
        let processor = CitationProcessor::new();
        let result = processor
            .process("[Source: url abc123] vs [Source: youtube abc123]");

        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[0].source_type, SourceType::Url);
        assert_eq!(result.citations[1].source_type, SourceType::Youtube);
        assert_eq!(result.citations[1].display_text, "YouTube video (abc123)");
    }

    #[test]
    fn test_identical_marker_text_resolved_per_occurrence() {
        let processor = CitationProcessor::new();
        // The same marker text appears at two positions with different
        // neighborhoods; both occurrences must be rewritten in place
        let text = "first[Source: image img_1]middle[Source: image img_1]last";
        let result = processor.process(text);

        assert_eq!(result.citations.len(), 1);
        assert!(
            result
                .text
                .starts_with("first[[1]](#source-1)middle[[1]](#source-1)last")
        );
    }

    #[test]
    fn test_idempotent_on_processed_text() {
        let processor = CitationProcessor::new();
        let first = processor.process(
            "See [Source: PDF document e1f2a3] and [Source: youtube dQw4w9].",
        );
        let second = processor.process(&first.text);

        assert_eq!(second.text, first.text);
        assert!(second.citations.is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let processor = CitationProcessor::new();
        let text = "X [Source: url a.com] Y [Source: image b] Z [Source: url a.com]";
        assert_eq!(processor.process(text), processor.process(text));
    }

    #[test]
    fn test_text_without_markers_is_unchanged() {
        let processor = CitationProcessor::new();
        let text = "Plain answer with [brackets] and [links](#somewhere) intact.";
        let result = processor.process(text);

        assert_eq!(result.text, text);
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_malformed_markers_left_untouched() {
        let processor = CitationProcessor::new();
        // Unknown label, wrong case, and missing identifier all pass through
        let text = "[Source: video abc] [Source: URL abc] [Source: url] [Source: pdf document x]";
        let result = processor.process(text);

        assert_eq!(result.text, text);
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_malformed_marker_consumes_no_number() {
        let processor = CitationProcessor::new();
        let result = processor
            .process("[Source: video nope] then [Source: url real.com]");

        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].number, 1);
        assert_eq!(result.citations[0].identifier, "real.com");
        assert!(result.text.contains("[Source: video nope] then [[1]](#source-1)"));
    }

    #[test]
    fn test_multi_word_label_with_spaced_identifier() {
        let processor = CitationProcessor::new();
        let result = processor.process("[Source: PDF document e1f2 a3b4]");

        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].identifier, "e1f2 a3b4");
        assert_eq!(
            result.citations[0].display_text,
            "PDF document (e1f2 a3b4)"
        );
    }

    #[test]
    fn test_sources_block_lists_numeric_order() {
        let processor = CitationProcessor::new();
        let result = processor.process(
            "[Source: youtube v1] [Source: url a.com] [Source: PDF document d1]",
        );

        let block_start = result.text.find("**Sources:**").unwrap();
        let block = &result.text[block_start..];
        let pos_1 = block.find("1. <a id=\"source-1\"></a>YouTube video (v1)").unwrap();
        let pos_2 = block.find("2. <a id=\"source-2\"></a>a.com").unwrap();
        let pos_3 = block.find("3. <a id=\"source-3\"></a>PDF document (d1)").unwrap();
        assert!(pos_1 < pos_2 && pos_2 < pos_3);
    }
}
