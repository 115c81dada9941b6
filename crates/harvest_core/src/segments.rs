use std::collections::{HashMap, HashSet};

pub const DEFAULT_SEPARATOR: &str = "#+#";

/// Fragments shorter than this are never treated as boilerplate.
pub const MIN_BOILERPLATE_LEN: usize = 5;

/// Drops navigation/footer noise from a page's text fragments.
///
/// Fragments of at least [`MIN_BOILERPLATE_LEN`] characters that occur more
/// than `max_repeats` times are removed everywhere; then runs of identical
/// neighbours collapse to one.
pub fn dedup_segments(segments: Vec<String>, max_repeats: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for segment in &segments {
        *counts.entry(segment.as_str()).or_default() += 1;
    }
    let boilerplate: HashSet<String> = counts
        .into_iter()
        .filter(|(segment, count)| {
            *count > max_repeats && segment.chars().count() >= MIN_BOILERPLATE_LEN
        })
        .map(|(segment, _)| segment.to_string())
        .collect();

    let mut kept: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        if boilerplate.contains(&segment) || kept.last() == Some(&segment) {
            continue;
        }
        kept.push(segment);
    }
    kept
}

/// Visible text of a page (or of a page plus its frames), kept as ordered
/// segments so the boundaries survive until persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    segments: Vec<String>,
    separator: String,
}

impl ExtractedText {
    pub fn new(segments: Vec<String>, separator: impl Into<String>) -> Self {
        Self {
            segments,
            separator: separator.into(),
        }
    }

    pub fn empty(separator: impl Into<String>) -> Self {
        Self::new(Vec::new(), separator)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|segment| segment.is_empty())
    }

    /// Appends another text's segments after this one's.
    pub fn extend(&mut self, other: ExtractedText) {
        self.segments.extend(other.segments);
    }

    pub fn joined(&self) -> String {
        self.segments.join(&self.separator)
    }

    pub fn char_count(&self) -> usize {
        self.joined().chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| segment.split_whitespace().count())
            .sum()
    }
}

impl Default for ExtractedText {
    fn default() -> Self {
        Self::empty(DEFAULT_SEPARATOR)
    }
}
