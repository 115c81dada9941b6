use std::collections::HashSet;

use harvest_core::ExtractedText;
use harvest_logging::harvest_warn;
use scraper::{Html, Selector};

use crate::extract::TextExtractor;
use crate::fetch::{ArchivedPage, PageFetcher};
use crate::links::{resolve_frame_src, LinkResolver};

pub const DEFAULT_FRAME_DEPTH: usize = 3;

/// Text of a page together with everything its frames contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub text: ExtractedText,
    pub subpages: Vec<String>,
}

/// What one document yields before any of its frames are fetched.
struct DocumentScan {
    text: ExtractedText,
    subpages: Vec<String>,
    frames: Vec<String>,
}

/// Frame-aware extraction: a page's own text followed by the text of its
/// `frame`/`iframe` children in document order, down to `max_depth` levels.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    text: TextExtractor,
    links: LinkResolver,
    max_depth: usize,
}

impl FrameExtractor {
    pub fn new(text: TextExtractor, links: LinkResolver, max_depth: usize) -> Self {
        Self {
            text,
            links,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub async fn extract(&self, page: &ArchivedPage, fetcher: &dyn PageFetcher) -> PageExtraction {
        let mut text = self.text.empty();
        let mut subpages = Vec::new();
        if self.max_depth == 0 {
            return PageExtraction { text, subpages };
        }

        let mut seen_links = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(page.requested_url.clone());
        visited.insert(page.final_url.clone());

        // Pending frame fetches with the depth left for the fetched document.
        let mut stack: Vec<(String, usize)> = Vec::new();
        let mut saw_frames = false;

        let mut current = Some((self.scan(page), self.max_depth));
        loop {
            if let Some((scan, remaining)) = current.take() {
                text.extend(scan.text);
                for link in scan.subpages {
                    if seen_links.insert(link.clone()) {
                        subpages.push(link);
                    }
                }
                saw_frames |= !scan.frames.is_empty();
                if remaining > 1 {
                    stack.extend(scan.frames.into_iter().rev().map(|url| (url, remaining - 1)));
                }
            }

            let Some((url, remaining)) = stack.pop() else {
                break;
            };
            if !visited.insert(url.clone()) {
                continue;
            }
            match fetcher.fetch_page(&url).await {
                Ok(child) => {
                    visited.insert(child.final_url.clone());
                    current = Some((self.scan(&child), remaining));
                }
                Err(err) => harvest_warn!("Could not fetch frame content {}: {}", url, err),
            }
        }

        if saw_frames && text.is_empty() {
            harvest_warn!("Frame-based page yielded no text: {}", page.requested_url);
        }
        PageExtraction { text, subpages }
    }

    /// Parses one document. Kept synchronous so the parsed tree never lives
    /// across an await point.
    fn scan(&self, page: &ArchivedPage) -> DocumentScan {
        let document = Html::parse_document(&page.html);
        let text = self.text.extract_document(&document);
        let Some(locator) = page.locator() else {
            return DocumentScan {
                text,
                subpages: Vec::new(),
                frames: Vec::new(),
            };
        };

        let subpages = self.links.resolve(&document, &locator);
        let frames = match Selector::parse("frame[src], iframe[src]") {
            Ok(selector) => document
                .select(&selector)
                .filter_map(|frame| frame.value().attr("src"))
                .filter_map(|src| resolve_frame_src(&locator, src))
                .collect(),
            Err(_) => Vec::new(),
        };
        DocumentScan {
            text,
            subpages,
            frames,
        }
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(
            TextExtractor::default(),
            LinkResolver::default(),
            DEFAULT_FRAME_DEPTH,
        )
    }
}
