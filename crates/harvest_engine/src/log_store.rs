use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use harvest_logging::{harvest_debug, harvest_warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A row of an [`AppendLog`]; the key decides which rows supersede each other.
pub trait LogRecord: Serialize + DeserializeOwned + Clone + Send {
    fn key(&self) -> &str;
}

struct LogInner<R> {
    file: File,
    index: HashMap<String, R>,
}

/// JSON Lines file mirrored by an in-memory index. Rows are only ever
/// appended; on reload the last row per key wins.
pub struct AppendLog<R> {
    path: PathBuf,
    inner: Mutex<LogInner<R>>,
}

impl<R: LogRecord> AppendLog<R> {
    /// Opens (creating if needed) the log at `path` and loads every row that
    /// still parses. Lines cut short by an interrupted write are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let (index, torn_tail) = load_index::<R>(&path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
        if torn_tail {
            file.write_all(b"\n")?;
        }

        harvest_debug!("Loaded {} rows from {:?}", index.len(), path);
        Ok(Self {
            path,
            inner: Mutex::new(LogInner { file, index }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<R> {
        self.lock().index.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes one row, flushes and syncs it, then publishes it to the index.
    /// Both happen under one lock, so readers never see an unpersisted row.
    pub fn append(&self, record: R) -> Result<(), LogError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut inner = self.lock();
        inner.file.write_all(line.as_bytes())?;
        inner.file.flush()?;
        inner.file.sync_data()?;
        inner.index.insert(record.key().to_string(), record);
        Ok(())
    }

    pub fn values(&self) -> Vec<R> {
        self.lock().index.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner<R>> {
        // A panic mid-append leaves at worst a truncated line, which reload skips.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Returns the index and whether the file ends mid-line.
fn load_index<R: LogRecord>(path: &Path) -> Result<(HashMap<String, R>, bool), LogError> {
    let mut index = HashMap::new();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok((index, false)),
        Err(source) => {
            return Err(LogError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut skipped = 0usize;
    for line in bytes.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<R>(line) {
            Ok(record) => {
                index.insert(record.key().to_string(), record);
            }
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        harvest_warn!("Skipped {} malformed rows in {:?}", skipped, path);
    }
    let torn_tail = bytes.last().is_some_and(|b| *b != b'\n');
    Ok((index, torn_tail))
}
