use harvest_core::{Target, Window};
use harvest_engine::{
    fill_missing_sites, CachedSiteSource, LookupTable, SiteSource, SourceError,
    DEFAULT_CACHE_TTL_SECS,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn target(entity_id: &str, site: &str) -> Target {
    Target::new(entity_id, site, Window::calendar_year(2020).unwrap())
}

/// Knows one site per entity and records which entities it was asked about.
struct StaticSource {
    name: &'static str,
    known: Vec<(&'static str, &'static str)>,
    available: bool,
}

#[async_trait::async_trait]
impl SiteSource for StaticSource {
    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fill(&self, targets: &mut [Target]) -> Result<usize, SourceError> {
        let mut filled = 0;
        for target in targets.iter_mut().filter(|target| !target.has_site()) {
            if let Some((_, site)) = self.known.iter().find(|(id, _)| *id == target.entity_id) {
                target.site_url = site.to_string();
                filled += 1;
            }
        }
        Ok(filled)
    }
}

struct BrokenSource;

#[async_trait::async_trait]
impl SiteSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    async fn fill(&self, _targets: &mut [Target]) -> Result<usize, SourceError> {
        Err(SourceError::Lookup("service unreachable".to_string()))
    }
}

#[tokio::test]
async fn waterfall_fills_from_each_source_in_turn() {
    let sources: Vec<Box<dyn SiteSource>> = vec![
        Box::new(BrokenSource),
        Box::new(StaticSource {
            name: "offline",
            known: vec![("C", "http://never.com")],
            available: false,
        }),
        Box::new(StaticSource {
            name: "first",
            known: vec![("A", "http://a.com"), ("B", "http://wrong.com")],
            available: true,
        }),
        Box::new(StaticSource {
            name: "second",
            known: vec![("C", "http://c.com")],
            available: true,
        }),
    ];
    let mut targets = vec![
        target("A", ""),
        target("B", "http://b.com"),
        target("C", ""),
        target("D", ""),
    ];

    let filled = fill_missing_sites(&sources, &mut targets).await;

    assert_eq!(filled, 2);
    let sites: Vec<&str> = targets.iter().map(|t| t.site_url.as_str()).collect();
    assert_eq!(sites, vec!["http://a.com", "http://b.com", "http://c.com", ""]);
}

#[tokio::test]
async fn cached_sites_are_reused_on_later_runs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sites.jsonl");
    {
        let cache = CachedSiteSource::new(LookupTable::open(&path, DEFAULT_CACHE_TTL_SECS).unwrap());
        let stored = cache
            .remember(&[target("A", "http://a.com"), target("B", "")])
            .unwrap();
        assert_eq!(stored, 1);
        assert_eq!(cache.remember(&[target("A", "http://a.com")]).unwrap(), 0);
    }

    let sources: Vec<Box<dyn SiteSource>> = vec![Box::new(CachedSiteSource::new(
        LookupTable::open(&path, DEFAULT_CACHE_TTL_SECS).unwrap(),
    ))];
    let mut targets = vec![target("A", ""), target("B", "")];
    assert_eq!(fill_missing_sites(&sources, &mut targets).await, 1);
    assert_eq!(targets[0].site_url, "http://a.com");
    assert!(!targets[1].has_site());
}
