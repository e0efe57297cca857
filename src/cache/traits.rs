//! Abstract cache store trait.
//!
//! The trait is the seam between the resolver and the persistence backend:
//! - an in-memory backend for tests and embedded use
//! - a durable backend for production runs
//!
//! The store is the sole owner of cache records; the resolver only reads
//! and writes through it.

use thiserror::Error;

use crate::heading::HeadingKind;
use crate::outcome::CacheRecord;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Another process holds the cache lock.
    #[error("cache is locked by another process: {path}")]
    Locked {
        /// The lock file path.
        path: String,
    },

    /// Backend I/O failure.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("cache record serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Maps an I/O error into the matching cache error.
    pub fn from_io(err: &std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::WouldBlock {
            Self::Locked {
                path: path.display().to_string(),
            }
        } else {
            Self::Backend(format!("{}: {err}", path.display()))
        }
    }
}

/// A persistent mapping from `(kind, normalized key)` to a resolution
/// record.
///
/// # Contract
/// - `put` overwrites any existing record for the same key
/// - a `put` must be durably visible to a later `get` within the same run
/// - writes are atomic at record granularity: a crash mid-write must never
///   surface a partial record on the next open
pub trait CacheStore: Send + Sync {
    /// Look up the record for a heading, if one exists.
    fn get(&self, kind: HeadingKind, key: &str) -> Result<Option<CacheRecord>, CacheError>;

    /// Insert or overwrite the record for `(record.kind, record.key)`.
    fn put(&self, record: CacheRecord) -> Result<(), CacheError>;

    /// Number of records currently held.
    fn len(&self) -> Result<usize, CacheError>;

    /// True if the store holds no records.
    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
