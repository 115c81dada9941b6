use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::{normalize_url, SnapshotRecord};

/// Width of the time bucket used for temporal dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketWidth {
    Month,
    Quarter,
    Year,
}

impl BucketWidth {
    pub fn months(self) -> u32 {
        match self {
            BucketWidth::Month => 1,
            BucketWidth::Quarter => 3,
            BucketWidth::Year => 12,
        }
    }

    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            1 => Some(BucketWidth::Month),
            3 => Some(BucketWidth::Quarter),
            12 => Some(BucketWidth::Year),
            _ => None,
        }
    }
}

/// How snapshot volume is reduced before fetching. The default keeps every
/// capture the index returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotPolicy {
    pub bucket: Option<BucketWidth>,
    pub sample_cap: Option<usize>,
}

impl SnapshotPolicy {
    /// Bucket dedup first, then stratified sampling of what remains.
    pub fn apply(&self, snapshots: &[SnapshotRecord]) -> Vec<SnapshotRecord> {
        let deduped = match self.bucket {
            Some(width) => dedup_by_bucket(snapshots, width),
            None => snapshots.to_vec(),
        };
        match self.sample_cap {
            Some(cap) => sample_stratified(&deduped, cap),
            None => deduped,
        }
    }
}

/// Keeps the latest capture per (normalized URL, bucket); later captures are
/// the ones most likely to be complete. Output is chronological.
pub fn dedup_by_bucket(snapshots: &[SnapshotRecord], width: BucketWidth) -> Vec<SnapshotRecord> {
    let mut latest: HashMap<(String, i32, u32), &SnapshotRecord> = HashMap::new();
    for snapshot in snapshots {
        let bucket = (snapshot.timestamp.month() - 1) / width.months();
        let key = (
            normalize_url(&snapshot.original_url),
            snapshot.timestamp.year(),
            bucket,
        );
        match latest.entry(key) {
            Entry::Occupied(mut slot) => {
                if snapshot.timestamp > slot.get().timestamp {
                    slot.insert(snapshot);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(snapshot);
            }
        }
    }

    let mut kept: Vec<SnapshotRecord> = latest.into_values().cloned().collect();
    sort_chronologically(&mut kept);
    kept
}

/// Caps volume at `cap` without favouring over-captured months: one capture
/// per month per pass, months in calendar order, until the cap is reached.
pub fn sample_stratified(snapshots: &[SnapshotRecord], cap: usize) -> Vec<SnapshotRecord> {
    if snapshots.len() <= cap {
        return snapshots.to_vec();
    }

    let mut by_month: BTreeMap<&str, Vec<&SnapshotRecord>> = BTreeMap::new();
    for snapshot in snapshots {
        by_month
            .entry(snapshot.timestamp.month_key())
            .or_default()
            .push(snapshot);
    }
    let strata: Vec<Vec<&SnapshotRecord>> = by_month
        .into_values()
        .map(|mut stratum| {
            stratum.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            stratum
        })
        .collect();

    let mut sampled = Vec::with_capacity(cap);
    let mut pass = 0;
    'passes: while sampled.len() < cap {
        let mut took_any = false;
        for stratum in &strata {
            if sampled.len() == cap {
                break 'passes;
            }
            if let Some(snapshot) = stratum.get(pass) {
                sampled.push((*snapshot).clone());
                took_any = true;
            }
        }
        if !took_any {
            break;
        }
        pass += 1;
    }

    sort_chronologically(&mut sampled);
    sampled
}

fn sort_chronologically(snapshots: &mut [SnapshotRecord]) {
    snapshots.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.archive_url.cmp(&b.archive_url))
    });
}
