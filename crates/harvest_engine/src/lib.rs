//! Harvest engine: archive IO, extraction and the checkpointed harvest loop.
mod cache;
mod cdx;
mod decode;
mod events;
mod extract;
mod fetch;
mod filename;
mod frames;
mod harvest;
mod links;
mod log_store;
mod persist;
mod pool;
mod progress;
mod rate_limit;
mod sources;
mod types;

pub use cache::{apply_page_type_overrides, LookupTable, DEFAULT_CACHE_TTL_SECS};
pub use cdx::{
    parse_index_rows, CdxClient, IndexError, IndexSettings, SnapshotIndex, DEFAULT_CDX_ENDPOINT,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use events::{HarvestEvent, LogProgressSink, ProgressSink};
pub use extract::{TextExtractor, DEFAULT_MAX_REPEATS};
pub use fetch::{
    check_fetchable, is_archived_page, mentions_rate_limit, strip_archive_chrome, ArchiveFetcher,
    ArchivedPage, FetchSettings, PageFetcher, DEFAULT_USER_AGENT,
};
pub use filename::record_filename;
pub use frames::{FrameExtractor, PageExtraction, DEFAULT_FRAME_DEPTH};
pub use harvest::{HarvestError, HarvestSettings, Harvester, TargetReport};
pub use links::{resolve_frame_src, LinkResolver, DEFAULT_EXCLUDED_DOMAINS};
pub use log_store::{AppendLog, LogError, LogRecord};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, RecordWriter, RUN_SUMMARY_FILE};
pub use pool::{run_harvest, PoolSettings, RunSummary};
pub use progress::ProgressTracker;
pub use rate_limit::{RateLimitSettings, RateLimiter};
pub use sources::{fill_missing_sites, CachedSiteSource, SiteSource, SourceError};
pub use types::{FailureKind, FetchError};
