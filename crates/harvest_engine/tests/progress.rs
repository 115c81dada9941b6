use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use harvest_core::{
    CacheEntry, ExtractedText, PageRecord, PageType, SnapshotRecord, Target, Timestamp,
    UnitOutcome, Window, DEFAULT_ARCHIVE_BASE,
};
use harvest_engine::{
    apply_page_type_overrides, LookupTable, ProgressTracker, DEFAULT_CACHE_TTL_SECS,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn target() -> Target {
    Target::new("H0CA12", "http://site.com", Window::calendar_year(2020).unwrap())
}

fn unit(n: usize) -> String {
    format!("https://web.archive.org/web/2020060{}120000/http://site.com/", n % 9 + 1)
        + &n.to_string()
}

#[test]
fn checkpoints_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress_roster.jsonl");

    let tracker = ProgressTracker::open(&path).unwrap();
    assert!(tracker.is_empty());
    tracker.mark_done(&target(), &unit(1), UnitOutcome::Complete, 3).unwrap();
    tracker.mark_done(&target(), &unit(2), UnitOutcome::Error, 0).unwrap();
    drop(tracker);

    let reopened = ProgressTracker::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert!(reopened.is_done(&unit(1)));
    assert!(reopened.is_done(&unit(2)));
    assert!(!reopened.is_done(&unit(3)));

    let entry = reopened.entry(&unit(1)).unwrap();
    assert_eq!(entry.outcome, UnitOutcome::Complete);
    assert_eq!(entry.pages_written, 3);
    assert_eq!(entry.entity_id, "H0CA12");
}

#[test]
fn concurrent_writers_lose_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.jsonl");
    let tracker = Arc::new(ProgressTracker::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for n in 0..25 {
                    let key = unit(worker * 100 + n);
                    tracker.mark_done(&target(), &key, UnitOutcome::Complete, 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(tracker.len(), 200);

    let reopened = ProgressTracker::open(&path).unwrap();
    assert_eq!(reopened.len(), 200);
    let lines = fs::read_to_string(&path).unwrap().lines().count();
    assert_eq!(lines, 200);
}

#[test]
fn malformed_and_torn_lines_are_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.jsonl");
    {
        let tracker = ProgressTracker::open(&path).unwrap();
        tracker.mark_done(&target(), &unit(1), UnitOutcome::Complete, 1).unwrap();
    }
    let mut raw = fs::read(&path).unwrap();
    raw.extend_from_slice(b"not json at all\n\xff\xfe\n{\"unit_key\": \"half");
    fs::write(&path, raw).unwrap();

    let tracker = ProgressTracker::open(&path).unwrap();
    assert_eq!(tracker.len(), 1);
    tracker.mark_done(&target(), &unit(2), UnitOutcome::Complete, 1).unwrap();
    drop(tracker);

    let reopened = ProgressTracker::open(&path).unwrap();
    assert!(reopened.is_done(&unit(1)));
    assert!(reopened.is_done(&unit(2)));
}

#[test]
fn progress_file_is_named_after_the_roster() {
    assert_eq!(
        ProgressTracker::path_for_roster(Path::new("state"), Path::new("/data/house_2020.jsonl")),
        Path::new("state").join("progress_house_2020.jsonl")
    );
}

#[test]
fn stale_cache_rows_are_invisible() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sites.jsonl");
    let table = LookupTable::open(&path, DEFAULT_CACHE_TTL_SECS).unwrap();

    table.insert("H0CA12", "http://fresh.com").unwrap();
    table
        .insert_entry(CacheEntry {
            key: "S0TX01".to_string(),
            value: "http://stale.com".to_string(),
            cached_at: Utc::now().timestamp() - DEFAULT_CACHE_TTL_SECS - 60,
        })
        .unwrap();

    assert_eq!(table.get("H0CA12").as_deref(), Some("http://fresh.com"));
    assert_eq!(table.get("S0TX01"), None);
    assert_eq!(table.fresh_len(), 1);

    let reopened = LookupTable::open(&path, DEFAULT_CACHE_TTL_SECS).unwrap();
    assert_eq!(reopened.get("H0CA12").as_deref(), Some("http://fresh.com"));
}

#[test]
fn page_type_overrides_replace_url_labels() {
    let temp = TempDir::new().unwrap();
    let table = LookupTable::open(temp.path().join("types.jsonl"), DEFAULT_CACHE_TTL_SECS).unwrap();
    table.insert("site.com/platform-2020", "news").unwrap();
    table.insert("site.com/about", "not-a-type").unwrap();

    let snapshot = SnapshotRecord::new(
        DEFAULT_ARCHIVE_BASE,
        Timestamp::parse("20200601120000").unwrap(),
        "http://site.com/",
    );
    let text = ExtractedText::new(vec!["Some words".to_string()], "#+#");
    let mut rows: Vec<PageRecord> = ["platform-2020", "about", "contact"]
        .iter()
        .map(|page| {
            let url = format!("https://web.archive.org/web/20200601120000/http://site.com/{page}");
            PageRecord::from_page(&target(), &snapshot, &url, &text).unwrap()
        })
        .collect();

    assert_eq!(apply_page_type_overrides(&mut rows, &table), 1);
    assert_eq!(rows[0].page_type, PageType::News);
    assert_eq!(rows[1].page_type, PageType::Biography);
}
