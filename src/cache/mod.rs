//! Cache storage for resolution records.
//!
//! The cache survives process restarts so headings the services have
//! already answered - including affirmative "not found" answers - are never
//! sent over the network again.

mod memory;
mod persistent;
mod traits;

pub use memory::MemoryCache;
pub use persistent::{CacheConfig, FileLock, PersistentCache, RecordLog};
pub use traits::{CacheError, CacheStore};

use std::path::Path;

/// Open or create a persistent cache at the given directory.
///
/// # Errors
/// - If the directory cannot be created or accessed
/// - If another process holds the cache lock
///
/// # Example
/// ```rust,ignore
/// let cache = authlink::open_cache("./authority-cache", None)?;
/// ```
pub fn open_cache(
    dir: impl AsRef<Path>,
    config: Option<CacheConfig>,
) -> Result<PersistentCache, CacheError> {
    let config = config.unwrap_or_default();
    PersistentCache::open(dir.as_ref(), &config)
}
