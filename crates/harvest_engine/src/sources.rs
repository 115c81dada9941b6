use harvest_core::Target;
use harvest_logging::{harvest_debug, harvest_info, harvest_warn};
use thiserror::Error;

use crate::cache::LookupTable;
use crate::log_store::LogError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error(transparent)]
    Cache(#[from] LogError),
}

/// A provider of site URLs for targets that arrived without one.
#[async_trait::async_trait]
pub trait SiteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Sources that need credentials or a reachable service report `false`
    /// and are skipped.
    fn is_available(&self) -> bool {
        true
    }

    /// Fills `site_url` on targets it knows about. Only targets whose site is
    /// still empty may be touched. Returns how many were filled.
    async fn fill(&self, targets: &mut [Target]) -> Result<usize, SourceError>;
}

/// Tries each source in order; later sources only see what earlier ones left
/// unresolved. A failing source is logged and the waterfall moves on.
pub async fn fill_missing_sites(sources: &[Box<dyn SiteSource>], targets: &mut [Target]) -> usize {
    let mut filled = 0;
    for source in sources {
        let missing = targets.iter().filter(|target| !target.has_site()).count();
        if missing == 0 {
            break;
        }
        if !source.is_available() {
            harvest_debug!("Site source {} unavailable; skipping", source.name());
            continue;
        }
        match source.fill(targets).await {
            Ok(count) => {
                harvest_info!(
                    "Site source {} filled {} of {} missing sites",
                    source.name(),
                    count,
                    missing
                );
                filled += count;
            }
            Err(err) => harvest_warn!("Site source {} failed: {}", source.name(), err),
        }
    }
    filled
}

/// Site URLs remembered from earlier lookups, keyed by entity id.
pub struct CachedSiteSource {
    table: LookupTable,
}

impl CachedSiteSource {
    pub fn new(table: LookupTable) -> Self {
        Self { table }
    }

    /// Stores every target's known site for later runs.
    pub fn remember(&self, targets: &[Target]) -> Result<usize, SourceError> {
        let mut stored = 0;
        for target in targets.iter().filter(|target| target.has_site()) {
            if self.table.get(&target.entity_id).as_deref() == Some(target.site_url.as_str()) {
                continue;
            }
            self.table.insert(&target.entity_id, &target.site_url)?;
            stored += 1;
        }
        Ok(stored)
    }
}

#[async_trait::async_trait]
impl SiteSource for CachedSiteSource {
    fn name(&self) -> &str {
        "cache"
    }

    async fn fill(&self, targets: &mut [Target]) -> Result<usize, SourceError> {
        let mut filled = 0;
        for target in targets.iter_mut().filter(|target| !target.has_site()) {
            if let Some(site) = self.table.get(&target.entity_id) {
                target.site_url = site;
                filled += 1;
            }
        }
        Ok(filled)
    }
}
