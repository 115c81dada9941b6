use std::sync::Arc;
use std::time::Duration;

use harvest_core::{SnapshotRecord, Target, Timestamp, DEFAULT_ARCHIVE_BASE};
use harvest_logging::{harvest_debug, harvest_error, harvest_info, harvest_warn};
use thiserror::Error;

use crate::fetch::DEFAULT_USER_AGENT;
use crate::rate_limit::RateLimiter;

pub const DEFAULT_CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid index endpoint {0:?}")]
    Endpoint(String),
    #[error("index request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("index is rate limiting requests")]
    RateLimited,
    #[error("index answered http status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub endpoint: String,
    pub archive_base: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub row_limit: usize,
    pub user_agent: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            row_limit: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Source of the captures available for a target's site inside its window.
#[async_trait::async_trait]
pub trait SnapshotIndex: Send + Sync {
    /// Never fails: an index that stays unreachable yields no snapshots.
    async fn snapshots(&self, target: &Target) -> Vec<SnapshotRecord>;
}

pub struct CdxClient {
    client: reqwest::Client,
    settings: IndexSettings,
    limiter: Arc<RateLimiter>,
}

impl CdxClient {
    pub fn new(settings: IndexSettings, limiter: Arc<RateLimiter>) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            settings,
            limiter,
        })
    }

    /// Query URL for one target: prefix match over the window, HTML captures
    /// that answered 200, two fields per row.
    pub fn query_url(&self, target: &Target) -> Result<reqwest::Url, IndexError> {
        let mut url = reqwest::Url::parse(&self.settings.endpoint)
            .map_err(|_| IndexError::Endpoint(self.settings.endpoint.clone()))?;
        let (from, to) = target.window.index_bounds();
        url.query_pairs_mut()
            .append_pair("url", target.site_url.trim())
            .append_pair("matchType", "prefix")
            .append_pair("from", &from)
            .append_pair("to", &to)
            .append_pair("fl", "timestamp,original")
            .append_pair("filter", "statuscode:200")
            .append_pair("filter", "mimetype:text/html")
            .append_pair("limit", &self.settings.row_limit.to_string());
        Ok(url)
    }

    async fn query_once(&self, url: &reqwest::Url) -> Result<String, IndexError> {
        self.limiter.wait().await;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(IndexError::RateLimited);
        }
        if !status.is_success() {
            return Err(IndexError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl SnapshotIndex for CdxClient {
    async fn snapshots(&self, target: &Target) -> Vec<SnapshotRecord> {
        let url = match self.query_url(target) {
            Ok(url) => url,
            Err(err) => {
                harvest_error!("Cannot query index for {}: {}", target.entity_id, err);
                return Vec::new();
            }
        };

        let attempts = self.settings.max_retries.max(1);
        for attempt in 1..=attempts {
            match self.query_once(&url).await {
                Ok(body) => {
                    self.limiter.reset().await;
                    let raw_rows = raw_row_count(&body);
                    let rows = parse_index_rows(&body, target, &self.settings.archive_base);
                    if raw_rows >= self.settings.row_limit {
                        harvest_warn!(
                            "Index returned {} rows for {}; result is likely truncated",
                            raw_rows,
                            target.site_url
                        );
                    }
                    harvest_info!(
                        "Index lists {} captures for {} ({})",
                        rows.len(),
                        target.entity_id,
                        target.site_url
                    );
                    return rows;
                }
                Err(err) if attempt < attempts => {
                    if matches!(err, IndexError::RateLimited) {
                        let delay = self.limiter.backoff().await;
                        harvest_warn!(
                            "Index is rate limiting; backed off to {:.1}s",
                            delay.as_secs_f64()
                        );
                    }
                    let pause = self.settings.retry_delay * attempt;
                    harvest_warn!(
                        "Index query failed for {} (attempt {}/{}): {}; retrying in {:.0}s",
                        target.site_url,
                        attempt,
                        attempts,
                        err,
                        pause.as_secs_f64()
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(err) => {
                    harvest_error!(
                        "Index query failed after {} attempts for {}: {}",
                        attempts,
                        target.site_url,
                        err
                    );
                }
            }
        }
        Vec::new()
    }
}

/// Non-empty lines in the index's answer, malformed ones included.
fn raw_row_count(body: &str) -> usize {
    body.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Parses the index's plain-text answer, one `timestamp original` row per
/// line. Rows that are malformed or fall outside the target window are
/// skipped one by one.
pub fn parse_index_rows(body: &str, target: &Target, archive_base: &str) -> Vec<SnapshotRecord> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let parsed = match (fields.next(), fields.next(), fields.next()) {
            (Some(stamp), Some(original), None) => Timestamp::parse(stamp)
                .filter(|stamp| target.window.contains(stamp))
                .map(|stamp| SnapshotRecord::new(archive_base, stamp, original)),
            _ => None,
        };
        match parsed {
            Some(record) => rows.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        harvest_debug!("Skipped {} unusable index rows for {}", skipped, target.site_url);
    }
    rows
}
