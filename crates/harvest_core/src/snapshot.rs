use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::archive::archive_url;

/// A 14-digit `YYYYMMDDhhmmss` capture stamp.
///
/// Fixed width makes lexical order chronological, so the derived `Ord` is used
/// directly for sorting and "latest wins" comparisons.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    pub const LEN: usize = 14;

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() != Self::LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let month: u32 = raw[4..6].parse().ok()?;
        let day: u32 = raw[6..8].parse().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    /// Month in `1..=12`.
    pub fn month(&self) -> u32 {
        self.0[4..6].parse().unwrap_or(1)
    }

    /// `YYYYMM`, the key used for month strata.
    pub fn month_key(&self) -> &str {
        &self.0[..6]
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0[..8], "%Y%m%d").ok()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid capture timestamp {value:?}"))
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

/// One archived capture found in a target's window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: Timestamp,
    pub original_url: String,
    pub archive_url: String,
}

impl SnapshotRecord {
    pub fn new(archive_base: &str, timestamp: Timestamp, original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        let archive_url = archive_url(archive_base, timestamp.as_str(), &original_url);
        Self {
            timestamp,
            original_url,
            archive_url,
        }
    }
}
