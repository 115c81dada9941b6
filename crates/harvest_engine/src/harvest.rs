use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use harvest_core::{
    prioritize_urls, ExtractedText, PageRecord, SnapshotPolicy, SnapshotRecord, Target,
    UnitOutcome,
};
use harvest_logging::{harvest_debug, harvest_error, harvest_warn};
use serde::Serialize;
use thiserror::Error;

use crate::cdx::SnapshotIndex;
use crate::events::{HarvestEvent, LogProgressSink, ProgressSink};
use crate::fetch::PageFetcher;
use crate::frames::FrameExtractor;
use crate::persist::{PersistError, RecordWriter};
use crate::progress::ProgressTracker;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to persist records: {0}")]
    Persist(#[from] PersistError),
    #[error("unit panicked: {0}")]
    Panicked(String),
    #[error("blocking write task failed: {0}")]
    WriteTask(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Default)]
pub struct HarvestSettings {
    pub policy: SnapshotPolicy,
    /// Cap on subpages fetched per snapshot visit, applied after ordering by
    /// page type. `None` follows every in-site link of the home capture.
    pub max_subpages: Option<usize>,
}

/// Per-target tally. A snapshot counts as persisted when at least one page
/// row was written for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub entity_id: String,
    pub snapshots_found: usize,
    pub attempted: usize,
    pub skipped: usize,
    pub persisted: usize,
    pub pages_written: usize,
    pub errors: usize,
}

/// Drives one target at a time through index, reduction, visits, persistence
/// and checkpointing. Cheap to share behind an `Arc` across workers.
pub struct Harvester {
    index: Arc<dyn SnapshotIndex>,
    fetcher: Arc<dyn PageFetcher>,
    progress: Arc<ProgressTracker>,
    records: Arc<RecordWriter>,
    frames: FrameExtractor,
    settings: HarvestSettings,
    sink: Arc<dyn ProgressSink>,
}

impl Harvester {
    pub fn new(
        index: Arc<dyn SnapshotIndex>,
        fetcher: Arc<dyn PageFetcher>,
        progress: Arc<ProgressTracker>,
        records: Arc<RecordWriter>,
    ) -> Self {
        Self {
            index,
            fetcher,
            progress,
            records,
            frames: FrameExtractor::default(),
            settings: HarvestSettings::default(),
            sink: Arc::new(LogProgressSink),
        }
    }

    pub fn with_frames(mut self, frames: FrameExtractor) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_settings(mut self, settings: HarvestSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    pub async fn harvest_target(&self, target: &Target) -> TargetReport {
        let mut report = TargetReport {
            entity_id: target.entity_id.clone(),
            ..TargetReport::default()
        };
        if !target.has_site() {
            harvest_warn!("Skipping {}: no site URL", target.entity_id);
            return report;
        }

        self.sink.emit(HarvestEvent::TargetStarted {
            entity_id: target.entity_id.clone(),
            site_url: target.site_url.clone(),
        });

        let snapshots = self.index.snapshots(target).await;
        report.snapshots_found = snapshots.len();
        let selected = self.settings.policy.apply(&snapshots);
        let pending = selected
            .iter()
            .filter(|snapshot| !self.progress.is_done(&snapshot.archive_url))
            .count();
        self.sink.emit(HarvestEvent::SnapshotsSelected {
            entity_id: target.entity_id.clone(),
            found: snapshots.len(),
            selected: selected.len(),
            pending,
        });

        for snapshot in &selected {
            if self.progress.is_done(&snapshot.archive_url) {
                report.skipped += 1;
                continue;
            }
            report.attempted += 1;

            let result = AssertUnwindSafe(self.visit(target, snapshot))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HarvestError::Panicked(panic_message(panic.as_ref())))
                });

            let (outcome, pages) = match result {
                Ok(pages) => (UnitOutcome::Complete, pages),
                Err(err) => {
                    harvest_error!(
                        "Error harvesting {} snapshot {}: {}",
                        target.entity_id,
                        snapshot.archive_url,
                        err
                    );
                    report.errors += 1;
                    (UnitOutcome::Error, 0)
                }
            };
            if pages > 0 {
                report.persisted += 1;
                report.pages_written += pages;
            }

            let progress = Arc::clone(&self.progress);
            let (owner, unit_key) = (target.clone(), snapshot.archive_url.clone());
            let checkpoint = tokio::task::spawn_blocking(move || {
                progress.mark_done(&owner, &unit_key, outcome, pages)
            })
            .await;
            let failure = match checkpoint {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(err) => Some(err.to_string()),
            };
            if let Some(err) = failure {
                harvest_error!(
                    "Failed to checkpoint {} for {}: {}",
                    snapshot.archive_url,
                    target.entity_id,
                    err
                );
            }
            self.sink.emit(HarvestEvent::UnitFinished {
                entity_id: target.entity_id.clone(),
                unit_key: snapshot.archive_url.clone(),
                outcome,
                pages_written: pages,
            });
        }

        self.sink.emit(HarvestEvent::TargetFinished {
            entity_id: target.entity_id.clone(),
            persisted: report.persisted,
            errors: report.errors,
        });
        report
    }

    /// One snapshot visit: home capture, its frames, then its subpages.
    /// Returns the number of page rows written.
    async fn visit(
        &self,
        target: &Target,
        snapshot: &SnapshotRecord,
    ) -> Result<usize, HarvestError> {
        let fetcher = self.fetcher.as_ref();
        let home = match fetcher.fetch_page(&snapshot.archive_url).await {
            Ok(page) => page,
            Err(err) => {
                harvest_debug!("Home capture unavailable {}: {}", snapshot.archive_url, err);
                return Ok(0);
            }
        };

        let home_extraction = self.frames.extract(&home, fetcher).await;
        let mut explored: HashSet<String> = HashSet::new();
        explored.insert(snapshot.archive_url.clone());
        explored.insert(home.final_url.clone());

        let mut pages: Vec<(String, ExtractedText)> =
            vec![(snapshot.archive_url.clone(), home_extraction.text)];

        let mut candidates = prioritize_urls(
            home_extraction
                .subpages
                .into_iter()
                .filter(|url| !explored.contains(url))
                .collect(),
        );
        if let Some(cap) = self.settings.max_subpages {
            candidates.truncate(cap);
        }

        for url in candidates {
            if !explored.insert(url.clone()) {
                continue;
            }
            let page = match fetcher.fetch_page(&url).await {
                Ok(page) => page,
                Err(_) => continue,
            };
            let extraction = self.frames.extract(&page, fetcher).await;
            pages.push((url, extraction.text));
        }

        let rows = unique_content_rows(target, snapshot, pages);
        let records = Arc::clone(&self.records);
        let owner = target.clone();
        let written = tokio::task::spawn_blocking(move || records.append(&owner, &rows)).await??;
        Ok(written)
    }
}

/// Keeps the first page of each distinct text and drops empty pages.
fn unique_content_rows(
    target: &Target,
    snapshot: &SnapshotRecord,
    pages: Vec<(String, ExtractedText)>,
) -> Vec<PageRecord> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .filter(|(_, text)| seen.insert(text.joined()))
        .filter_map(|(url, text)| PageRecord::from_page(target, snapshot, &url, &text))
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
