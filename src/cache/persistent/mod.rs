//! Persistent cache backend.
//!
//! Durable, crash-safe storage for resolution records:
//! - Append-only record log, replayed on open
//! - File locking for single-process access
//! - CRC32 checksums for corruption detection
//!
//! The layout is a directory holding `headings.log` and `.lock`. Deleting
//! the directory forces a full re-resolve on the next run.

mod codec;
mod file_lock;
mod log;
mod store;

pub use file_lock::FileLock;
pub use log::RecordLog;
pub use store::PersistentCache;

/// Configuration for the persistent cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether to fsync after every write (slower but safe against power
    /// loss, not just process crash).
    pub sync_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
        }
    }
}
