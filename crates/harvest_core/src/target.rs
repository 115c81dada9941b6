use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Inclusive calendar window a target is harvested over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whole calendar year, the usual window for an election cycle.
    pub fn calendar_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn contains(&self, timestamp: &Timestamp) -> bool {
        timestamp
            .date()
            .map(|date| date >= self.start && date <= self.end)
            .unwrap_or(false)
    }

    /// `(from, to)` bounds in the archive index's `YYYYMMDD` form.
    pub fn index_bounds(&self) -> (String, String) {
        (
            self.start.format("%Y%m%d").to_string(),
            self.end.format("%Y%m%d").to_string(),
        )
    }
}

/// One entity whose site is harvested over a fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub entity_id: String,
    #[serde(default)]
    pub site_url: String,
    pub window: Window,
    /// Echoed into every output row for downstream joins.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Target {
    pub fn new(entity_id: impl Into<String>, site_url: impl Into<String>, window: Window) -> Self {
        Self {
            entity_id: entity_id.into(),
            site_url: site_url.into(),
            window,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn has_site(&self) -> bool {
        !self.site_url.trim().is_empty()
    }
}
