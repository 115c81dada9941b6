use harvest_core::UnitOutcome;
use harvest_logging::{harvest_debug, harvest_info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    TargetStarted {
        entity_id: String,
        site_url: String,
    },
    SnapshotsSelected {
        entity_id: String,
        found: usize,
        selected: usize,
        pending: usize,
    },
    UnitFinished {
        entity_id: String,
        unit_key: String,
        outcome: UnitOutcome,
        pages_written: usize,
    },
    TargetFinished {
        entity_id: String,
        persisted: usize,
        errors: usize,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Writes events to the log: target milestones at info, units at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::TargetStarted {
                entity_id,
                site_url,
            } => harvest_info!("Harvesting {} ({})", entity_id, site_url),
            HarvestEvent::SnapshotsSelected {
                entity_id,
                found,
                selected,
                pending,
            } => harvest_info!(
                "{}: {} captures found, {} selected, {} not yet attempted",
                entity_id,
                found,
                selected,
                pending
            ),
            HarvestEvent::UnitFinished {
                entity_id,
                unit_key,
                outcome,
                pages_written,
            } => harvest_debug!(
                "{}: {} finished {:?} with {} pages",
                entity_id,
                unit_key,
                outcome,
                pages_written
            ),
            HarvestEvent::TargetFinished {
                entity_id,
                persisted,
                errors,
            } => harvest_info!(
                "{}: finished, {} snapshots persisted, {} errors",
                entity_id,
                persisted,
                errors
            ),
        }
    }
}
