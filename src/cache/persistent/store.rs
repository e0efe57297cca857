//! Persistent cache store.
//!
//! Wraps:
//! - An in-memory index for reads
//! - The append-only record log for durable writes
//! - A file lock for single-process access

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::cache::traits::{CacheError, CacheStore};
use crate::heading::HeadingKind;
use crate::outcome::CacheRecord;

use super::file_lock::FileLock;
use super::log::RecordLog;
use super::CacheConfig;

fn lock_err(context: &'static str) -> CacheError {
    CacheError::Backend(format!("poisoned lock: {context}"))
}

/// Durable [`CacheStore`] backed by an append-only log.
///
/// Writes go through to disk before `put` returns; the lock file keeps a
/// second process out for the lifetime of this value and is released on
/// drop on every exit path.
#[derive(Debug)]
pub struct PersistentCache {
    index: RwLock<HashMap<(HeadingKind, String), CacheRecord>>,
    log: RecordLog,
    _lock: FileLock,
}

impl PersistentCache {
    /// Name of the log file inside the cache directory.
    pub const LOG_FILE: &'static str = "headings.log";

    /// Open or create a cache in `dir`, replaying any existing log.
    ///
    /// # Errors
    /// - `CacheError::Locked` if another process holds the cache
    /// - `CacheError::Backend` if the directory or log cannot be used
    pub fn open(dir: &Path, config: &CacheConfig) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir).map_err(|e| CacheError::from_io(&e, dir))?;

        let lock = FileLock::acquire(dir).map_err(|e| CacheError::from_io(&e, dir))?;

        let log_path = dir.join(Self::LOG_FILE);
        let mut index = HashMap::new();

        if log_path.exists() {
            let records =
                RecordLog::replay(&log_path).map_err(|e| CacheError::from_io(&e, &log_path))?;
            // Last write per key wins, matching put-overwrites semantics.
            for record in records {
                index.insert((record.kind, record.key.clone()), record);
            }
        }

        let log = RecordLog::open(&log_path, config.sync_on_write)
            .map_err(|e| CacheError::from_io(&e, &log_path))?;

        Ok(Self {
            index: RwLock::new(index),
            log,
            _lock: lock,
        })
    }
}

impl CacheStore for PersistentCache {
    fn get(&self, kind: HeadingKind, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let index = self.index.read().map_err(|_| lock_err("persistent get"))?;
        Ok(index.get(&(kind, key.to_string())).cloned())
    }

    fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        // Disk first: if the append fails the index stays consistent with
        // what a reopen would see.
        self.log
            .append(&record)
            .map_err(|e| CacheError::from_io(&e, self.log.path()))?;

        let mut index = self.index.write().map_err(|_| lock_err("persistent put"))?;
        index.insert((record.kind, record.key.clone()), record);
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let index = self.index.read().map_err(|_| lock_err("persistent len"))?;
        Ok(index.len())
    }
}
