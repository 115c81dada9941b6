use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use harvest_core::Target;
use harvest_logging::{harvest_error, harvest_info, harvest_warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::harvest::{Harvester, TargetReport};

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub workers: usize,
    /// Pause between targets when running with a single worker.
    pub inter_target_pause: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: 8,
            inter_target_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub targets: usize,
    pub finished_targets: usize,
    pub not_started: usize,
    pub snapshots_found: usize,
    pub attempted: usize,
    pub skipped: usize,
    pub persisted: usize,
    pub pages_written: usize,
    pub errors: usize,
    pub failed_targets: Vec<String>,
}

impl RunSummary {
    fn absorb(&mut self, outcome: TargetOutcome) {
        match outcome {
            TargetOutcome::Finished(report) => {
                self.finished_targets += 1;
                self.snapshots_found += report.snapshots_found;
                self.attempted += report.attempted;
                self.skipped += report.skipped;
                self.persisted += report.persisted;
                self.pages_written += report.pages_written;
                self.errors += report.errors;
            }
            TargetOutcome::Failed { entity_id, reason } => {
                harvest_error!("Target {} aborted: {}", entity_id, reason);
                self.failed_targets.push(entity_id);
            }
            TargetOutcome::NotStarted => self.not_started += 1,
        }
    }
}

enum TargetOutcome {
    Finished(TargetReport),
    Failed { entity_id: String, reason: String },
    NotStarted,
}

/// Runs every target through the harvester on a bounded pool of tasks.
///
/// Each target runs in its own task, so a panic ends only that target.
/// Cancellation is checked before a target starts; targets already running
/// finish their current work.
pub async fn run_harvest(
    harvester: Arc<Harvester>,
    targets: Vec<Target>,
    settings: PoolSettings,
    cancel: CancellationToken,
) -> RunSummary {
    let mut summary = RunSummary {
        targets: targets.len(),
        ..RunSummary::default()
    };
    let workers = settings.workers.max(1);
    harvest_info!("Harvesting {} targets with {} workers", targets.len(), workers);

    if workers == 1 {
        let total = targets.len();
        for (position, target) in targets.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.absorb(TargetOutcome::NotStarted);
                continue;
            }
            summary.absorb(run_target(harvester.clone(), target).await);
            if position + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(settings.inter_target_pause) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }
    } else {
        let mut outcomes = stream::iter(targets.into_iter().map(|target| {
            let harvester = harvester.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return TargetOutcome::NotStarted;
                }
                run_target(harvester, target).await
            }
        }))
        .buffer_unordered(workers);

        while let Some(outcome) = outcomes.next().await {
            summary.absorb(outcome);
        }
    }

    if summary.not_started > 0 {
        harvest_warn!(
            "Run cancelled; {} targets were not started",
            summary.not_started
        );
    }
    harvest_info!(
        "Run finished: {} snapshots persisted of {} attempted, {} pages, {} errors",
        summary.persisted,
        summary.attempted,
        summary.pages_written,
        summary.errors
    );
    summary
}

async fn run_target(harvester: Arc<Harvester>, target: Target) -> TargetOutcome {
    let entity_id = target.entity_id.clone();
    let handle = tokio::spawn(async move { harvester.harvest_target(&target).await });
    match handle.await {
        Ok(report) => TargetOutcome::Finished(report),
        Err(err) => TargetOutcome::Failed {
            entity_id,
            reason: err.to_string(),
        },
    }
}
