use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ArchiveLocator;

/// Content type of a harvested page, inferred from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Homepage,
    Issues,
    Biography,
    News,
    Endorsements,
    ConstituentServices,
    Action,
    Other,
}

impl PageType {
    /// Priority order, homepage first.
    pub const ALL: [PageType; 8] = [
        PageType::Homepage,
        PageType::Issues,
        PageType::Biography,
        PageType::News,
        PageType::Endorsements,
        PageType::ConstituentServices,
        PageType::Action,
        PageType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Homepage => "homepage",
            PageType::Issues => "issues",
            PageType::Biography => "biography",
            PageType::News => "news",
            PageType::Endorsements => "endorsements",
            PageType::ConstituentServices => "constituent_services",
            PageType::Action => "action",
            PageType::Other => "other",
        }
    }

    pub fn priority(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        PageType::ALL
            .into_iter()
            .find(|page_type| page_type.as_str() == label)
            .ok_or_else(|| format!("unknown page type {s:?}"))
    }
}

/// Router files and generic prefixes that templated sites put in front of the
/// meaningful segment (`/public/index.cfm/press-releases`, `/pages/donate`).
const ROUTER_NOISE: &[&str] = &[
    "public",
    "pages",
    "index.cfm",
    "index.php",
    "index.asp",
    "index.aspx",
    "index.jsp",
    "default.asp",
    "default.aspx",
];

struct Rule {
    page_type: PageType,
    exact: &'static [&'static str],
    prefixes: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        page_type: PageType::Issues,
        exact: &[
            "issue",
            "the-issues",
            "on-the-issues",
            "platform",
            "priorities",
            "agenda",
            "positions",
            "plan",
            "plans",
            "legislation",
            "policy",
            "policies",
            "proven-leader",
            "where-i-stand",
        ],
        prefixes: &["issues", "issue-"],
    },
    Rule {
        page_type: PageType::Biography,
        exact: &[
            "about",
            "bio",
            "biography",
            "story",
            "our-story",
            "background",
            "meet",
            "who-we-are",
        ],
        prefixes: &["about-", "meet-", "meet_"],
    },
    Rule {
        page_type: PageType::News,
        exact: &[
            "news",
            "press",
            "pressreleases",
            "newsroom",
            "media",
            "blog",
            "category",
            "articles",
            "updates",
            "in-the-news",
            "statements",
        ],
        prefixes: &["news-", "press-", "media-"],
    },
    Rule {
        page_type: PageType::Endorsements,
        exact: &["supporters", "campaign-supporters"],
        prefixes: &["endorse"],
    },
    Rule {
        page_type: PageType::ConstituentServices,
        exact: &[
            "constituentservices",
            "constituent-services",
            "services",
            "district",
            "offices",
            "office-locations",
            "casework",
            "resources",
            "help",
        ],
        prefixes: &[],
    },
    Rule {
        page_type: PageType::Action,
        exact: &[
            "contribute",
            "get-involved",
            "take-action",
            "join",
            "support",
            "events",
            "event",
            "calendar",
            "signup",
            "sign-up",
        ],
        prefixes: &["donate", "volunteer"],
    },
];

/// Maps an archive (or plain) URL to its page type by its first meaningful
/// path segment.
pub fn classify_page_type(url: &str) -> PageType {
    let original = original_url_of(url);
    let segments = path_segments(&original);
    let first = segments
        .iter()
        .map(String::as_str)
        .find(|segment| !ROUTER_NOISE.contains(segment));

    let Some(first) = first else {
        return PageType::Homepage;
    };
    if first == "home" || first.starts_with("home.") || first.starts_with("index.") {
        return PageType::Homepage;
    }

    RULES
        .iter()
        .find(|rule| {
            rule.exact.contains(&first) || rule.prefixes.iter().any(|p| first.starts_with(p))
        })
        .map(|rule| rule.page_type)
        .unwrap_or(PageType::Other)
}

/// Stable sort by page-type priority.
pub fn prioritize_urls(mut urls: Vec<String>) -> Vec<String> {
    urls.sort_by_key(|url| classify_page_type(url).priority());
    urls
}

/// The wrapped original URL of a replay URL, or the input itself.
pub fn original_url_of(url: &str) -> String {
    ArchiveLocator::parse(url)
        .map(|locator| locator.original().to_string())
        .unwrap_or_else(|| url.trim().to_string())
}

/// Timestamp- and scheme-independent key for one page across captures.
pub fn url_pattern(original_url: &str) -> String {
    let url = original_url.trim();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// Leading router noise is skipped by the caller; this only splits the path.
fn path_segments(original: &str) -> Vec<String> {
    let end = original.find(['?', '#']).unwrap_or(original.len());
    let original = &original[..end];

    let path = if original.starts_with('/') {
        original
    } else {
        let without_scheme = original
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(original);
        without_scheme
            .find('/')
            .map(|idx| &without_scheme[idx..])
            .unwrap_or("")
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect()
}
