use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{classify_page_type, ExtractedText, PageType, SnapshotRecord, Target, Timestamp};

/// One persisted output row: a single page of a single snapshot visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub entity_id: String,
    pub site_url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub capture_timestamp: Timestamp,
    pub archive_url: String,
    pub original_url: String,
    pub page_type: PageType,
    pub extracted_text: String,
    pub char_count: usize,
    pub word_count: usize,
}

impl PageRecord {
    /// Builds the row for a page fetched during the visit of `snapshot`.
    ///
    /// Returns `None` when the page carries no text; such pages are never
    /// persisted.
    pub fn from_page(
        target: &Target,
        snapshot: &SnapshotRecord,
        page_url: &str,
        text: &ExtractedText,
    ) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let extracted_text = text.joined();
        Some(Self {
            entity_id: target.entity_id.clone(),
            site_url: target.site_url.clone(),
            metadata: target.metadata.clone(),
            capture_timestamp: snapshot.timestamp.clone(),
            archive_url: page_url.to_string(),
            original_url: crate::original_url_of(page_url),
            page_type: classify_page_type(page_url),
            char_count: extracted_text.chars().count(),
            word_count: text.word_count(),
            extracted_text,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOutcome {
    Complete,
    Error,
}

/// Checkpoint row for one snapshot visit, keyed by the home capture's
/// archive URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub unit_key: String,
    pub outcome: UnitOutcome,
    pub entity_id: String,
    pub site_url: String,
    #[serde(default)]
    pub pages_written: usize,
    pub recorded_at: DateTime<Utc>,
}

impl CheckpointEntry {
    pub fn new(target: &Target, unit_key: impl Into<String>, outcome: UnitOutcome) -> Self {
        Self {
            unit_key: unit_key.into(),
            outcome,
            entity_id: target.entity_id.clone(),
            site_url: target.site_url.clone(),
            pages_written: 0,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_pages(mut self, pages_written: usize) -> Self {
        self.pages_written = pages_written;
        self
    }
}

/// Row of an auxiliary lookup table. `cached_at` is seconds since the Unix
/// epoch; the table decides freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub cached_at: i64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            cached_at: Utc::now().timestamp(),
        }
    }

    pub fn is_fresh(&self, now: i64, ttl_secs: i64) -> bool {
        now.saturating_sub(self.cached_at) < ttl_secs
    }
}
