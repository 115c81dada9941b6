use ego_tree::iter::Edge;
use harvest_core::{dedup_segments, ExtractedText, DEFAULT_SEPARATOR};
use scraper::node::Node;
use scraper::Html;

/// Elements whose text never reaches the reader. The raw-text containers
/// (`noscript`, `noframes`, `iframe`, `template`) hold fallback markup that
/// the parser keeps as plain text.
const HIDDEN_ELEMENTS: &[&str] = &[
    "script", "style", "head", "title", "meta", "noscript", "noframes", "iframe", "template",
];

/// Fragments of this many characters or fewer are layout debris.
const MAX_DEBRIS_LEN: usize = 2;

pub const DEFAULT_MAX_REPEATS: usize = 2;

#[derive(Debug, Clone)]
pub struct TextExtractor {
    separator: String,
    max_repeats: usize,
}

impl TextExtractor {
    pub fn new(separator: impl Into<String>, max_repeats: usize) -> Self {
        Self {
            separator: separator.into(),
            max_repeats,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn extract(&self, html: &str) -> ExtractedText {
        let document = Html::parse_document(html);
        self.extract_document(&document)
    }

    pub fn extract_document(&self, document: &Html) -> ExtractedText {
        let fragments = visible_fragments(document);
        ExtractedText::new(
            dedup_segments(fragments, self.max_repeats),
            self.separator.clone(),
        )
    }

    pub fn empty(&self) -> ExtractedText {
        ExtractedText::empty(self.separator.clone())
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR, DEFAULT_MAX_REPEATS)
    }
}

/// Text nodes in document order, trimmed, outside hidden containers.
fn visible_fragments(document: &Html) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut hidden_depth = 0usize;

    for edge in document.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) if is_hidden(element.name()) => hidden_depth += 1,
                Node::Text(text) if hidden_depth == 0 => {
                    let fragment = text.trim();
                    if fragment.chars().count() > MAX_DEBRIS_LEN {
                        fragments.push(fragment.to_string());
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(element) = node.value() {
                    if is_hidden(element.name()) {
                        hidden_depth = hidden_depth.saturating_sub(1);
                    }
                }
            }
        }
    }
    fragments
}

fn is_hidden(name: &str) -> bool {
    HIDDEN_ELEMENTS
        .iter()
        .any(|hidden| hidden.eq_ignore_ascii_case(name))
}
