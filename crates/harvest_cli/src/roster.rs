use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use harvest_core::Target;
use harvest_logging::{harvest_info, harvest_warn};

/// Reads a JSON Lines roster of targets. Lines that do not parse are logged
/// and skipped.
pub fn load_roster(path: &Path) -> Result<Vec<Target>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let targets = parse_roster(&content);
    harvest_info!("Loaded {} targets from {:?}", targets.len(), path);
    Ok(targets)
}

fn parse_roster(content: &str) -> Vec<Target> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str::<Target>(line) {
            Ok(target) => Some(target),
            Err(err) => {
                harvest_warn!("Skipping roster line {}: {}", number + 1, err);
                None
            }
        })
        .collect()
}
