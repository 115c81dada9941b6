//! RON run configuration. Every field is optional; a missing file section
//! falls back to the engine defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use harvest_core::{BucketWidth, SnapshotPolicy, DEFAULT_ARCHIVE_BASE, DEFAULT_SEPARATOR};
use harvest_engine::{
    FetchSettings, FrameExtractor, HarvestSettings, IndexSettings, LinkResolver, PoolSettings,
    RateLimitSettings, TextExtractor, DEFAULT_CDX_ENDPOINT, DEFAULT_EXCLUDED_DOMAINS,
    DEFAULT_FRAME_DEPTH, DEFAULT_MAX_REPEATS, DEFAULT_USER_AGENT,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub index: IndexConfig,
    pub fetch: FetchConfig,
    pub rate_limit: RateLimitConfig,
    pub extraction: ExtractionConfig,
    pub snapshots: SnapshotConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub endpoint: String,
    pub archive_base: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub row_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
            max_retries: 3,
            retry_delay_secs: 10,
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            row_limit: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            request_timeout_secs: 90,
            redirect_limit: 10,
            max_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub min_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            backoff_factor: 2.0,
            max_delay_secs: 360,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub separator: String,
    pub max_repeats: usize,
    pub frame_depth: usize,
    pub exclude_domains: Vec<String>,
    /// `None` follows every in-site link of a home capture.
    pub max_subpages: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_repeats: DEFAULT_MAX_REPEATS,
            frame_depth: DEFAULT_FRAME_DEPTH,
            exclude_domains: DEFAULT_EXCLUDED_DOMAINS
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
            max_subpages: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Keep the latest capture per URL per bucket of 1, 3 or 12 months.
    pub bucket_months: Option<u32>,
    pub sample_cap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub workers: usize,
    pub inter_target_pause_ms: u64,
    pub output_dir: PathBuf,
    pub progress_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            inter_target_pause_ms: 1000,
            output_dir: PathBuf::from("output"),
            progress_dir: PathBuf::from("progress"),
        }
    }
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = ron::from_str(content)?;
        config.snapshot_policy()?;
        Ok(config)
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            endpoint: self.index.endpoint.clone(),
            archive_base: self.index.archive_base.clone(),
            max_retries: self.index.max_retries,
            retry_delay: Duration::from_secs(self.index.retry_delay_secs),
            connect_timeout: Duration::from_secs(self.index.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.index.request_timeout_secs),
            row_limit: self.index.row_limit,
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        RateLimitSettings {
            min_delay: Duration::from_millis(self.rate_limit.min_delay_ms),
            backoff_factor: self.rate_limit.backoff_factor,
            max_delay: Duration::from_secs(self.rate_limit.max_delay_secs),
        }
    }

    pub fn frame_extractor(&self) -> FrameExtractor {
        FrameExtractor::new(
            TextExtractor::new(
                self.extraction.separator.clone(),
                self.extraction.max_repeats,
            ),
            LinkResolver::new(self.extraction.exclude_domains.clone()),
            self.extraction.frame_depth,
        )
    }

    pub fn snapshot_policy(&self) -> Result<SnapshotPolicy> {
        let bucket = match self.snapshots.bucket_months {
            None => None,
            Some(months) => match BucketWidth::from_months(months) {
                Some(width) => Some(width),
                None => bail!("bucket_months must be 1, 3 or 12, got {months}"),
            },
        };
        Ok(SnapshotPolicy {
            bucket,
            sample_cap: self.snapshots.sample_cap,
        })
    }

    pub fn harvest_settings(&self) -> Result<HarvestSettings> {
        Ok(HarvestSettings {
            policy: self.snapshot_policy()?,
            max_subpages: self.extraction.max_subpages,
        })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            workers: self.run.workers,
            inter_target_pause: Duration::from_millis(self.run.inter_target_pause_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_yields_engine_defaults() {
        let config = HarvestConfig::parse("()").unwrap();
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.index_settings(), IndexSettings::default());
        assert_eq!(config.fetch_settings(), FetchSettings::default());
        assert_eq!(config.rate_limit_settings(), RateLimitSettings::default());
        assert_eq!(config.snapshot_policy().unwrap(), SnapshotPolicy::default());
        assert_eq!(config.pool_settings().workers, 8);
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let config = HarvestConfig::parse(
            r#"(
                rate_limit: (min_delay_ms: 500),
                snapshots: (bucket_months: Some(3), sample_cap: Some(200)),
                extraction: (max_subpages: Some(50), frame_depth: 2),
                run: (workers: 1),
            )"#,
        )
        .unwrap();

        assert_eq!(
            config.rate_limit_settings().min_delay,
            Duration::from_millis(500)
        );
        assert_eq!(config.rate_limit.max_delay_secs, 360);
        assert_eq!(
            config.snapshot_policy().unwrap(),
            SnapshotPolicy {
                bucket: Some(BucketWidth::Quarter),
                sample_cap: Some(200),
            }
        );
        let harvest = config.harvest_settings().unwrap();
        assert_eq!(harvest.max_subpages, Some(50));
        assert_eq!(config.frame_extractor().max_depth(), 2);
        assert_eq!(config.pool_settings().workers, 1);
        assert_eq!(config.extraction.separator, DEFAULT_SEPARATOR);
    }

    #[test]
    fn unsupported_bucket_width_is_rejected() {
        let err = HarvestConfig::parse("(snapshots: (bucket_months: Some(2)))").unwrap_err();
        assert!(err.to_string().contains("bucket_months"));
    }

    #[test]
    fn unknown_syntax_is_an_error() {
        assert!(HarvestConfig::parse("(run: (workers: \"many\"))").is_err());
    }
}
