//! In-memory cache backend.
//!
//! Thread-safe reference implementation of [`CacheStore`], intended for
//! tests and for callers that explicitly opt out of persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::cache::traits::{CacheError, CacheStore};
use crate::heading::HeadingKind;
use crate::outcome::CacheRecord;

fn lock_err(context: &'static str) -> CacheError {
    CacheError::Backend(format!("poisoned lock: {context}"))
}

/// An in-memory [`CacheStore`] with no durability.
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: RwLock<HashMap<(HeadingKind, String), CacheRecord>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, kind: HeadingKind, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let records = self.records.read().map_err(|_| lock_err("memory get"))?;
        Ok(records.get(&(kind, key.to_string())).cloned())
    }

    fn put(&self, record: CacheRecord) -> Result<(), CacheError> {
        let mut records = self.records.write().map_err(|_| lock_err("memory put"))?;
        records.insert((record.kind, record.key.clone()), record);
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let records = self.records.read().map_err(|_| lock_err("memory len"))?;
        Ok(records.len())
    }
}
