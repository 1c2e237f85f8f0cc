//! Marker-based chunking.
//!
//! The corpus is split on a page marker, each page on a section marker, and every
//! piece is trimmed. Markers are matched as plain substrings, so they also split
//! mid-word. The text following a page marker up to the first whitespace
//! completes the page URL, which becomes the chunk source. Everything after it,
//! including text on the same line, is page body.

use super::{Chunk, Chunker};
use crate::config::CorpusSettings;
use tracing::debug;

/// Splits a corpus on literal page and section markers.
#[derive(Debug, Clone)]
pub struct MarkerChunker {
    page_marker: String,
    section_marker: String,
}

/// A scraped page: its header-derived source and body text.
struct Page<'a> {
    source: Option<String>,
    body: &'a str,
}

impl MarkerChunker {
    /// Create a chunker with explicit markers.
    pub fn new(page_marker: impl Into<String>, section_marker: impl Into<String>) -> Self {
        Self {
            page_marker: page_marker.into(),
            section_marker: section_marker.into(),
        }
    }

    /// Create a chunker from corpus settings.
    pub fn from_settings(settings: &CorpusSettings) -> Self {
        Self::new(&settings.page_marker, &settings.section_marker)
    }

    fn pages<'a>(&self, corpus: &'a str) -> Vec<Page<'a>> {
        if self.page_marker.is_empty() {
            return vec![Page {
                source: None,
                body: corpus,
            }];
        }

        let mut pieces = corpus.split(self.page_marker.as_str());
        // Text before the first marker has no header.
        let mut pages = vec![Page {
            source: None,
            body: pieces.next().unwrap_or_default(),
        }];

        for piece in pieces {
            let cut = piece.find(char::is_whitespace).unwrap_or(piece.len());
            let (url_rest, body) = piece.split_at(cut);
            let source = format!("{}{}", self.page_marker, url_rest)
                .trim_matches(|c: char| c == '-' || c.is_whitespace())
                .to_string();
            pages.push(Page {
                source: (!source.is_empty()).then_some(source),
                body: strip_closing_rule(body),
            });
        }

        pages
    }
}

/// Drop a dash rule that closes the marker line, as in `--- https://a ---`.
fn strip_closing_rule(body: &str) -> &str {
    let rest = body.trim_start_matches([' ', '\t']);
    let after = rest.trim_start_matches('-');
    let dashes = rest.len() - after.len();
    if dashes >= 2 && after.chars().next().map_or(true, char::is_whitespace) {
        after
    } else {
        body
    }
}

impl Default for MarkerChunker {
    fn default() -> Self {
        Self::from_settings(&CorpusSettings::default())
    }
}

impl Chunker for MarkerChunker {
    fn chunk(&self, corpus: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in self.pages(corpus) {
            let sections: Vec<&str> = if self.section_marker.is_empty() {
                vec![page.body]
            } else {
                page.body.split(self.section_marker.as_str()).collect()
            };

            for section in sections {
                let text = section.trim();
                if text.is_empty() {
                    continue;
                }
                chunks.push(Chunk::new(chunks.len(), text).with_source(page.source.clone()));
            }
        }

        debug!("Split corpus into {} chunks", chunks.len());
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_pages_and_sections() {
        let corpus = "--- https://a\nHello world NEXT Goodbye world --- https://b\nFoo bar";
        let chunks = MarkerChunker::default().chunk(corpus);

        assert_eq!(texts(&chunks), vec!["Hello world", "Goodbye world", "Foo bar"]);

        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let sources: Vec<Option<&str>> = chunks.iter().map(|c| c.source.as_deref()).collect();
        assert_eq!(sources, vec![Some("https://a"), Some("https://a"), Some("https://b")]);
    }

    #[test]
    fn test_text_before_first_page_has_no_source() {
        let corpus = "Intro text\n--- https://a ---\nBody";
        let chunks = MarkerChunker::default().chunk(corpus);

        assert_eq!(texts(&chunks), vec!["Intro text", "Body"]);
        assert_eq!(chunks[0].source, None);
        assert_eq!(chunks[1].source.as_deref(), Some("https://a"));
    }

    #[test]
    fn test_single_line_corpus_keeps_page_body() {
        let corpus = "--- https://a Hello world NEXT Goodbye world --- https://b Foo bar";
        let chunks = MarkerChunker::default().chunk(corpus);

        assert_eq!(texts(&chunks), vec!["Hello world", "Goodbye world", "Foo bar"]);
        let sources: Vec<Option<&str>> = chunks.iter().map(|c| c.source.as_deref()).collect();
        assert_eq!(sources, vec![Some("https://a"), Some("https://a"), Some("https://b")]);
    }

    #[test]
    fn test_text_after_url_on_marker_line_is_body() {
        let corpus = "--- https://shop.example/kit Starter kit contents\nThree boxes";
        let chunks = MarkerChunker::default().chunk(corpus);

        assert_eq!(texts(&chunks), vec!["Starter kit contents\nThree boxes"]);
        assert_eq!(chunks[0].source.as_deref(), Some("https://shop.example/kit"));
    }

    #[test]
    fn test_leading_dashes_in_body_are_kept() {
        let chunks = MarkerChunker::default().chunk("--- https://a\n-5% off today");
        assert_eq!(texts(&chunks), vec!["-5% off today"]);
    }

    #[test]
    fn test_no_delimiters_yields_single_trimmed_chunk() {
        let chunks = MarkerChunker::default().chunk("  just one passage \n");
        assert_eq!(texts(&chunks), vec!["just one passage"]);
    }

    #[test]
    fn test_empty_and_whitespace_corpus() {
        let chunker = MarkerChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\t \n").is_empty());
        assert!(chunker.chunk("--- https://a\n NEXT   NEXT\n--- https://b").is_empty());
    }

    #[test]
    fn test_section_marker_matches_mid_word() {
        let chunks = MarkerChunker::default().chunk("CONNEXTION");
        assert_eq!(texts(&chunks), vec!["CON", "ION"]);
    }

    #[test]
    fn test_empty_markers_keep_text_whole() {
        let chunker = MarkerChunker::new("", "");
        let chunks = chunker.chunk(" a NEXT b ");
        assert_eq!(texts(&chunks), vec!["a NEXT b"]);
    }

    #[test]
    fn test_chunking_is_deterministic_and_non_empty() {
        let corpus = "a NEXT  NEXT b --- https://x\nc NEXT\n\nNEXT d";
        let chunker = MarkerChunker::default();
        let first = chunker.chunk(corpus);
        let second = chunker.chunk(corpus);

        assert_eq!(first, second);
        assert!(first.iter().all(|c| !c.text.trim().is_empty()));
        assert_eq!(texts(&first), vec!["a", "b", "c", "d"]);
    }
}
