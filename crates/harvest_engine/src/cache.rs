use std::path::{Path, PathBuf};

use chrono::Utc;
use harvest_core::{url_pattern, CacheEntry, PageRecord, PageType};
use harvest_logging::harvest_debug;

use crate::log_store::{AppendLog, LogError, LogRecord};

impl LogRecord for CacheEntry {
    fn key(&self) -> &str {
        &self.key
    }
}

pub const DEFAULT_CACHE_TTL_SECS: i64 = 90 * 24 * 60 * 60;

/// Persistent key/value side table with a freshness window. Stale rows stay
/// on disk but are invisible to lookups.
pub struct LookupTable {
    log: AppendLog<CacheEntry>,
    ttl_secs: i64,
}

impl LookupTable {
    pub fn open(path: impl Into<PathBuf>, ttl_secs: i64) -> Result<Self, LogError> {
        let log = AppendLog::open(path)?;
        let table = Self { log, ttl_secs };
        harvest_debug!(
            "Lookup table {:?}: {} fresh of {} rows",
            table.log.path(),
            table.fresh_len(),
            table.log.len()
        );
        Ok(table)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Utc::now().timestamp();
        self.log
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl_secs))
            .map(|entry| entry.value)
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), LogError> {
        self.insert_entry(CacheEntry::new(key, value))
    }

    pub fn insert_entry(&self, entry: CacheEntry) -> Result<(), LogError> {
        self.log.append(entry)
    }

    pub fn fresh_len(&self) -> usize {
        let now = Utc::now().timestamp();
        self.log
            .values()
            .iter()
            .filter(|entry| entry.is_fresh(now, self.ttl_secs))
            .count()
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

/// Replaces URL-derived page types with labels from a reclassification table
/// keyed by [`url_pattern`]. Returns how many records changed.
pub fn apply_page_type_overrides(records: &mut [PageRecord], table: &LookupTable) -> usize {
    let mut changed = 0;
    for record in records.iter_mut() {
        let Some(label) = table.get(&url_pattern(&record.original_url)) else {
            continue;
        };
        match label.parse::<PageType>() {
            Ok(page_type) if page_type != record.page_type => {
                record.page_type = page_type;
                changed += 1;
            }
            Ok(_) => {}
            Err(err) => harvest_debug!("Ignoring override for {}: {}", record.original_url, err),
        }
    }
    changed
}
