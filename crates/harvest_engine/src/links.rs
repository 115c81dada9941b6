use std::collections::HashSet;

use harvest_core::{host_matches, resolve_reference, ArchiveLocator, Reference};
use scraper::{Html, Selector};

pub const DEFAULT_EXCLUDED_DOMAINS: &[&str] =
    &["twitter.com", "facebook.com", "instagram.com", "youtube.com"];

/// Finds the in-site subpages linked from an archived page and returns them
/// as replay URLs anchored to the capture they were found in.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    exclude_domains: Vec<String>,
}

impl LinkResolver {
    pub fn new(exclude_domains: Vec<String>) -> Self {
        let exclude_domains = exclude_domains
            .into_iter()
            .map(|domain| domain.trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();
        Self { exclude_domains }
    }

    pub fn resolve(&self, document: &Html, page: &ArchiveLocator) -> Vec<String> {
        let Some(domain) = page.bare_domain() else {
            return Vec::new();
        };
        let Ok(selector) = Selector::parse("a[href], area[href]") else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(link) = self.resolve_href(href, page, &domain) {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
        links
    }

    fn resolve_href(&self, href: &str, page: &ArchiveLocator, domain: &str) -> Option<String> {
        let lower = href.trim().to_ascii_lowercase();
        if self
            .exclude_domains
            .iter()
            .any(|excluded| lower.contains(excluded.as_str()))
        {
            return None;
        }

        match resolve_reference(page, href) {
            Reference::Archived(locator) => locator
                .original_host()
                .filter(|host| host_matches(host, domain))
                .map(|_| locator.url()),
            Reference::Original(url) => url
                .host_str()
                .filter(|host| host_matches(host, domain))
                .map(|_| page.wrap(url.as_str())),
            Reference::Ignored => None,
        }
    }
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDED_DOMAINS
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
        )
    }
}

/// Replay URL a frame's `src` points at, or `None` when it cannot be anchored.
pub fn resolve_frame_src(page: &ArchiveLocator, src: &str) -> Option<String> {
    match resolve_reference(page, src) {
        Reference::Archived(locator) => Some(locator.url()),
        Reference::Original(url) => Some(page.wrap(url.as_str())),
        Reference::Ignored => None,
    }
}
