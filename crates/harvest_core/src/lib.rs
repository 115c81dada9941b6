//! Harvest core: pure domain logic for archival harvesting, free of IO.
mod archive;
mod classify;
mod record;
mod reduce;
mod segments;
mod snapshot;
mod target;

pub use archive::{
    archive_url, bare_host, host_matches, normalize_url, resolve_reference, ArchiveLocator,
    Reference, DEFAULT_ARCHIVE_BASE,
};
pub use classify::{classify_page_type, original_url_of, prioritize_urls, url_pattern, PageType};
pub use record::{CacheEntry, CheckpointEntry, PageRecord, UnitOutcome};
pub use reduce::{dedup_by_bucket, sample_stratified, BucketWidth, SnapshotPolicy};
pub use segments::{dedup_segments, ExtractedText, DEFAULT_SEPARATOR, MIN_BOILERPLATE_LEN};
pub use snapshot::{SnapshotRecord, Timestamp};
pub use target::{Target, Window};
