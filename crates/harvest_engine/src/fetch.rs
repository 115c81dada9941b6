use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use harvest_core::ArchiveLocator;
use harvest_logging::{harvest_debug, harvest_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::decode::decode_html;
use crate::extract::TextExtractor;
use crate::rate_limit::RateLimiter;
use crate::{FailureKind, FetchError};

pub const TOOLBAR_END_MARKER: &str = "<!-- END WAYBACK TOOLBAR INSERT -->";
pub const FILE_ARCHIVED_MARKER: &str = "FILE ARCHIVED ON";

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".mp3", ".mp4", ".zip", ".doc", ".docx", ".xls",
    ".ppt", ".wmv", ".mov", ".avi",
];

const RATE_LIMIT_PHRASE: &str = "too many requests";

pub const DEFAULT_USER_AGENT: &str = "archive-harvest/0.1 (academic research)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(90),
            redirect_limit: 10,
            max_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A replay page that passed the archive-wrapper check, with the injected
/// toolbar and trailing archive comment already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPage {
    pub requested_url: String,
    pub final_url: String,
    pub html: String,
}

impl ArchivedPage {
    /// Locator used to resolve the page's links and frames: the final URL
    /// after redirects when that is still a replay URL, otherwise the
    /// requested one.
    pub fn locator(&self) -> Option<ArchiveLocator> {
        ArchiveLocator::parse(&self.final_url).or_else(|| ArchiveLocator::parse(&self.requested_url))
    }
}

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<ArchivedPage, FetchError>;
}

pub struct ArchiveFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
    limiter: Arc<RateLimiter>,
}

impl ArchiveFetcher {
    pub fn new(settings: FetchSettings, limiter: Arc<RateLimiter>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            settings,
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> Result<ArchivedPage, FetchError> {
        self.limiter.wait().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::new(FailureKind::RateLimited, status.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            body.extend_from_slice(&chunk);
        }

        let decoded = decode_html(&body, content_type.as_deref())
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        if !is_archived_page(&decoded.html) {
            return Err(FetchError::new(
                FailureKind::NotArchived,
                "archive wrapper markers missing",
            ));
        }
        Ok(ArchivedPage {
            requested_url: url.to_string(),
            final_url,
            html: strip_archive_chrome(&decoded.html),
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for ArchiveFetcher {
    async fn fetch_page(&self, url: &str) -> Result<ArchivedPage, FetchError> {
        let parsed = check_fetchable(url)?;

        let mut result = self.fetch_once(&parsed).await;
        let throttled = match &result {
            Ok(page) => mentions_rate_limit(&page.html),
            Err(err) => err.kind == FailureKind::RateLimited,
        };
        if throttled {
            let delay = self.limiter.backoff().await;
            harvest_warn!("Backing off {:.1}s before retrying {}", delay.as_secs_f64(), url);
            // A retried page that still names the phrase is kept as content.
            result = self.fetch_once(&parsed).await;
        }

        match &result {
            Ok(_) => self.limiter.reset().await,
            Err(err) if err.is_silent() => harvest_debug!("Skipping {}: {}", url, err),
            Err(err) => harvest_debug!("Failed to fetch {}: {}", url, err),
        }
        result
    }
}

/// Cheap pre-flight checks that never touch the network or the rate limiter.
pub fn check_fetchable(url: &str) -> Result<reqwest::Url, FetchError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::new(
            FailureKind::UnsupportedScheme,
            parsed.scheme().to_string(),
        ));
    }
    let path = parsed.path().to_ascii_lowercase();
    if let Some(ext) = SKIPPED_EXTENSIONS.iter().find(|ext| path.ends_with(*ext)) {
        return Err(FetchError::new(FailureKind::SkippedExtension, *ext));
    }
    Ok(parsed)
}

/// True when the reader-visible text of `html` carries the archive's
/// rate-limit phrase. Script bodies and attributes are not looked at.
pub fn mentions_rate_limit(html: &str) -> bool {
    TextExtractor::default()
        .extract(html)
        .segments()
        .iter()
        .any(|segment| segment.to_lowercase().contains(RATE_LIMIT_PHRASE))
}

pub fn is_archived_page(html: &str) -> bool {
    html.contains(TOOLBAR_END_MARKER) || html.contains(FILE_ARCHIVED_MARKER)
}

/// Drops everything up to the end of the injected toolbar and the comment
/// block the archive appends after the page.
pub fn strip_archive_chrome(html: &str) -> String {
    let body = html
        .rfind(TOOLBAR_END_MARKER)
        .map(|idx| &html[idx + TOOLBAR_END_MARKER.len()..])
        .unwrap_or(html);
    let body = body
        .find(FILE_ARCHIVED_MARKER)
        .and_then(|idx| body[..idx].rfind("<!--"))
        .map(|idx| &body[..idx])
        .unwrap_or(body);
    body.to_string()
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
