use url::Url;

pub const DEFAULT_ARCHIVE_BASE: &str = "https://web.archive.org";

const REPLAY_SEGMENT: &str = "/web/";

/// Builds `{base}/web/{timestamp}/{original}`.
pub fn archive_url(base: &str, timestamp: &str, original: &str) -> String {
    format!(
        "{}{}{}/{}",
        base.trim_end_matches('/'),
        REPLAY_SEGMENT,
        timestamp,
        original
    )
}

/// A parsed replay URL: archive origin, capture stamp (plus any replay
/// modifier such as `id_`) and the original URL it wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocator {
    origin: String,
    timestamp: String,
    modifier: String,
    original: String,
}

impl ArchiveLocator {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let idx = raw.find(REPLAY_SEGMENT)?;
        let origin = &raw[..idx];
        let (scheme, host) = origin.split_once("://")?;
        if scheme.is_empty() || host.is_empty() || host.contains('/') {
            return None;
        }

        let rest = &raw[idx + REPLAY_SEGMENT.len()..];
        let (token, original) = rest.split_once('/')?;
        let digits = token.bytes().take_while(u8::is_ascii_digit).count();
        // The archive accepts partial stamps, but never fewer than a year.
        if digits < 4 {
            return None;
        }
        let (timestamp, modifier) = token.split_at(digits);
        if !modifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return None;
        }

        Some(Self {
            origin: origin.to_string(),
            timestamp: timestamp.to_string(),
            modifier: modifier.to_string(),
            original: repair_original(original)?,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// `{origin}/web/{timestamp}{modifier}`
    pub fn prefix(&self) -> String {
        format!(
            "{}{}{}{}",
            self.origin, REPLAY_SEGMENT, self.timestamp, self.modifier
        )
    }

    /// Re-anchors another original URL to this capture.
    pub fn wrap(&self, original: &str) -> String {
        format!("{}/{}", self.prefix(), original)
    }

    pub fn url(&self) -> String {
        self.wrap(&self.original)
    }

    /// Host of the wrapped original URL, lower-cased.
    pub fn original_host(&self) -> Option<String> {
        Url::parse(&self.original)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    }

    /// Host of the wrapped original URL without a leading `www.` label.
    pub fn bare_domain(&self) -> Option<String> {
        self.original_host().map(|host| bare_host(&host).to_string())
    }

    fn same_archive(&self, other: &ArchiveLocator) -> bool {
        archive_host(&self.origin).eq_ignore_ascii_case(archive_host(&other.origin))
    }
}

fn archive_host(origin: &str) -> &str {
    origin.split_once("://").map(|(_, host)| host).unwrap_or(origin)
}

/// The archive collapses `http://` to `http:/` in some rewritten links and
/// drops the scheme in others.
fn repair_original(original: &str) -> Option<String> {
    let original = original.trim();
    if original.is_empty() {
        return None;
    }
    if original.contains("://") {
        return Some(original.to_string());
    }
    for scheme in ["https:/", "http:/"] {
        if let Some(rest) = original.strip_prefix(scheme) {
            return Some(format!("{scheme}/{rest}"));
        }
    }
    Some(format!("http://{original}"))
}

pub fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// True when `host` is `domain` or one of its subdomains, ignoring `www.`.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let host = bare_host(&host);
    let domain = domain.to_ascii_lowercase();
    let domain = bare_host(&domain);
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain)
            .map(|head| head.ends_with('.'))
            .unwrap_or(false)
}

/// Key used for temporal dedup: lower-case, no leading `www.`, no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let (scheme, rest) = match lower.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, lower.as_str()),
    };
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.trim_end_matches('/');
    match scheme {
        Some(scheme) => format!("{scheme}://{rest}"),
        None => rest.to_string(),
    }
}

/// What an `href`/`src` found on an archived page points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Already a replay URL on the page's archive.
    Archived(ArchiveLocator),
    /// An original-web URL: absolute, or relative and already resolved
    /// against the page's own original URL.
    Original(Url),
    /// Empty, fragment-only, non-http scheme or unparsable.
    Ignored,
}

/// Classifies a reference found on the page captured at `page`.
pub fn resolve_reference(page: &ArchiveLocator, reference: &str) -> Reference {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return Reference::Ignored;
    }

    if reference.starts_with(REPLAY_SEGMENT) {
        return archived(&format!("{}{}", page.origin, reference));
    }
    if reference.starts_with(&REPLAY_SEGMENT[1..])
        && reference[REPLAY_SEGMENT.len() - 1..].starts_with(|c: char| c.is_ascii_digit())
    {
        return archived(&format!("{}/{}", page.origin, reference));
    }

    match Url::parse(reference) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                return Reference::Ignored;
            }
            if let Some(locator) = ArchiveLocator::parse(reference) {
                if locator.same_archive(page) {
                    return Reference::Archived(locator);
                }
            }
            Reference::Original(without_fragment(url))
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let Ok(base) = Url::parse(page.original()) else {
                return Reference::Ignored;
            };
            match base.join(reference) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    Reference::Original(without_fragment(url))
                }
                _ => Reference::Ignored,
            }
        }
        Err(_) => Reference::Ignored,
    }
}

fn archived(absolute: &str) -> Reference {
    ArchiveLocator::parse(absolute)
        .map(Reference::Archived)
        .unwrap_or(Reference::Ignored)
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}
