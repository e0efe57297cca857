//! The resolution state machine.
//!
//! Cache first, network second, classify, persist, report. The cache is
//! consulted before any client is touched; a hit returns the stored outcome
//! with no network call and no courtesy delay. On a miss the kind-matching
//! client is dispatched and every cacheable outcome - including `NotFound`
//! and `Ambiguous` - is written back before returning, which is what makes
//! resolution idempotent across runs. `Error` is never persisted: transient
//! failures get a fresh attempt on the next run instead of poisoning the
//! cache.

use crate::authority::AuthorityClient;
use crate::cache::{CacheError, CacheStore};
use crate::heading::HeadingKind;
use crate::normalize::normalize;
use crate::outcome::{CacheRecord, Outcome};

/// The result of one [`Resolver::resolve_heading`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The classified outcome.
    pub outcome: Outcome,
    /// True if the outcome was served from the cache (no network call).
    pub from_cache: bool,
    /// The normalized key the heading was resolved under.
    pub key: String,
}

/// Orchestrates cache lookup, client dispatch, and record persistence.
pub struct Resolver<'a> {
    cache: &'a dyn CacheStore,
    subjects: &'a dyn AuthorityClient,
    names: &'a dyn AuthorityClient,
}

impl<'a> Resolver<'a> {
    /// Wire a resolver over a cache and the two authority clients.
    pub fn new(
        cache: &'a dyn CacheStore,
        subjects: &'a dyn AuthorityClient,
        names: &'a dyn AuthorityClient,
    ) -> Self {
        Self {
            cache,
            subjects,
            names,
        }
    }

    /// Resolve one heading.
    ///
    /// # Errors
    /// Only cache I/O failures; every service-level condition comes back as
    /// an [`Outcome`].
    pub fn resolve_heading(
        &self,
        kind: HeadingKind,
        raw_text: &str,
    ) -> Result<Resolution, CacheError> {
        let key = normalize(raw_text);

        if let Some(record) = self.cache.get(kind, &key)? {
            return Ok(Resolution {
                outcome: record.outcome.into(),
                from_cache: true,
                key,
            });
        }

        let client = match kind {
            HeadingKind::Subject => self.subjects,
            HeadingKind::PersonalName | HeadingKind::CorporateName => self.names,
        };
        let outcome = client.resolve(kind, &key);

        if let Some(stored) = outcome.to_stored() {
            self.cache.put(CacheRecord::new(kind, key.clone(), stored))?;
        }

        Ok(Resolution {
            outcome,
            from_cache: false,
            key,
        })
    }
}
