use std::path::{Path, PathBuf};

use harvest_core::{CheckpointEntry, Target, UnitOutcome};

use crate::log_store::{AppendLog, LogError, LogRecord};

impl LogRecord for CheckpointEntry {
    fn key(&self) -> &str {
        &self.unit_key
    }
}

/// Resumable record of attempted units, shared by every worker of a run.
///
/// Only membership is consulted on re-run; a unit checkpointed with an error
/// counts as attempted.
pub struct ProgressTracker {
    log: AppendLog<CheckpointEntry>,
}

impl ProgressTracker {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        Ok(Self {
            log: AppendLog::open(path)?,
        })
    }

    /// `<progress_dir>/progress_<roster stem>.jsonl`
    pub fn path_for_roster(progress_dir: &Path, roster: &Path) -> PathBuf {
        let stem = roster
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "roster".to_string());
        progress_dir.join(format!("progress_{stem}.jsonl"))
    }

    pub fn is_done(&self, unit_key: &str) -> bool {
        self.log.contains(unit_key)
    }

    pub fn mark_done(
        &self,
        target: &Target,
        unit_key: &str,
        outcome: UnitOutcome,
        pages_written: usize,
    ) -> Result<(), LogError> {
        let entry = CheckpointEntry::new(target, unit_key, outcome).with_pages(pages_written);
        self.log.append(entry)
    }

    pub fn entry(&self, unit_key: &str) -> Option<CheckpointEntry> {
        self.log.get(unit_key)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }
}
