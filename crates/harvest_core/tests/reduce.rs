use std::sync::Once;

use harvest_core::{
    dedup_by_bucket, sample_stratified, BucketWidth, SnapshotPolicy, SnapshotRecord, Timestamp,
    DEFAULT_ARCHIVE_BASE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(harvest_logging::initialize_for_tests);
}

fn snap(stamp: &str, original: &str) -> SnapshotRecord {
    SnapshotRecord::new(
        DEFAULT_ARCHIVE_BASE,
        Timestamp::parse(stamp).expect("valid stamp"),
        original,
    )
}

fn stamps(records: &[SnapshotRecord]) -> Vec<&str> {
    records.iter().map(|r| r.timestamp.as_str()).collect()
}

#[test]
fn monthly_buckets_keep_latest_capture_per_month() {
    init_logging();
    let input = vec![
        snap("20200105000000", "http://site.com/"),
        snap("20200120000000", "http://site.com/"),
        snap("20200210000000", "http://site.com/"),
        snap("20200315000000", "http://site.com/"),
        snap("20200330000000", "http://site.com/"),
    ];

    let kept = dedup_by_bucket(&input, BucketWidth::Month);

    assert_eq!(
        stamps(&kept),
        vec!["20200120000000", "20200210000000", "20200330000000"]
    );
}

#[test]
fn quarterly_and_yearly_buckets_widen_the_group() {
    init_logging();
    let input = vec![
        snap("20200105000000", "http://site.com/"),
        snap("20200120000000", "http://site.com/"),
        snap("20200210000000", "http://site.com/"),
        snap("20200315000000", "http://site.com/"),
        snap("20200330000000", "http://site.com/"),
    ];

    let quarterly = dedup_by_bucket(&input, BucketWidth::Quarter);
    assert_eq!(stamps(&quarterly), vec!["20200330000000"]);

    let mut spread = input.clone();
    spread.push(snap("20201101000000", "http://site.com/"));
    spread.push(snap("20210101000000", "http://site.com/"));
    let yearly = dedup_by_bucket(&spread, BucketWidth::Year);
    assert_eq!(stamps(&yearly), vec!["20201101000000", "20210101000000"]);
}

#[test]
fn url_variants_share_a_bucket_but_distinct_pages_do_not() {
    init_logging();
    let input = vec![
        snap("20200101000000", "http://www.Site.com/"),
        snap("20200115000000", "http://site.com"),
        snap("20200110000000", "http://site.com/about"),
    ];

    let kept = dedup_by_bucket(&input, BucketWidth::Month);

    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].original_url, "http://site.com/about");
    assert_eq!(kept[1].original_url, "http://site.com");
}

#[test]
fn sampling_spreads_evenly_across_months() {
    init_logging();
    // 600 captures over 12 months, 50 a month.
    let mut input = Vec::new();
    for month in 1..=12 {
        for n in 0..50 {
            let stamp = format!("2020{month:02}{:02}{:02}0000", n % 28 + 1, n % 24);
            input.push(snap(&stamp, &format!("http://site.com/p{n}")));
        }
    }

    let sampled = sample_stratified(&input, 200);

    assert_eq!(sampled.len(), 200);
    for month in 1..=12 {
        let key = format!("2020{month:02}");
        let count = sampled
            .iter()
            .filter(|r| r.timestamp.month_key() == key)
            .count();
        assert!((16..=17).contains(&count), "month {key} got {count}");
    }
    assert!(sampled
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn sampling_prefers_sparse_months_over_crowded_ones() {
    init_logging();
    let mut input = vec![snap("20200115000000", "http://site.com/")];
    for day in 1..=28 {
        input.push(snap(&format!("202006{day:02}000000"), "http://site.com/"));
    }

    let sampled = sample_stratified(&input, 3);

    assert_eq!(
        stamps(&sampled),
        vec!["20200115000000", "20200601000000", "20200602000000"]
    );
}

#[test]
fn sampling_under_cap_is_identity() {
    init_logging();
    let input = vec![
        snap("20200301000000", "http://site.com/"),
        snap("20200101000000", "http://site.com/"),
    ];

    assert_eq!(sample_stratified(&input, 10), input);
}

#[test]
fn default_policy_keeps_everything() {
    init_logging();
    let input = vec![
        snap("20200101000000", "http://site.com/"),
        snap("20200102000000", "http://site.com/"),
    ];

    assert_eq!(SnapshotPolicy::default().apply(&input), input);

    let policy = SnapshotPolicy {
        bucket: Some(BucketWidth::Month),
        sample_cap: Some(1),
    };
    assert_eq!(stamps(&policy.apply(&input)), vec!["20200102000000"]);
}
