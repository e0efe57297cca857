//! Resolution outcomes and the persisted cache record.
//!
//! The four outcome kinds are ordinary values, not errors: the orchestrator
//! pattern-matches one enum instead of catching exceptions. Only the first
//! three are ever persisted; `Error` is transient by definition and
//! [`CacheRecord`] cannot represent it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::heading::HeadingKind;

/// One identifier/label pair returned by a search-style authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable URI of the authority record.
    pub uri: String,
    /// The record's preferred label.
    pub label: String,
}

impl Candidate {
    /// Creates a candidate from anything string-like.
    pub fn new(uri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
        }
    }
}

/// The classified result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exactly one authoritative match.
    Resolved {
        /// Stable URI of the authority record.
        uri: String,
        /// The authoritative form of the heading.
        label: String,
    },
    /// Two or more candidates with no unique exact-label match.
    Ambiguous {
        /// All candidates, in the order the service returned them.
        candidates: Vec<Candidate>,
    },
    /// The service affirmatively reported zero matches.
    NotFound,
    /// The service returned something the client cannot interpret.
    /// Never cached; always surfaced to the caller.
    Error {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl Outcome {
    /// Creates an `Error` outcome.
    #[must_use]
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error {
            detail: detail.into(),
        }
    }

    /// True if this outcome may be written to the cache.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// The persistable form of this outcome, or `None` for `Error`.
    #[must_use]
    pub fn to_stored(&self) -> Option<StoredOutcome> {
        match self {
            Self::Resolved { uri, label } => Some(StoredOutcome::Resolved {
                uri: uri.clone(),
                label: label.clone(),
            }),
            Self::Ambiguous { candidates } => Some(StoredOutcome::Ambiguous {
                candidates: candidates.clone(),
            }),
            Self::NotFound => Some(StoredOutcome::NotFound),
            Self::Error { .. } => None,
        }
    }

    /// Short tag for log lines.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Resolved { .. } => "resolved",
            Self::Ambiguous { .. } => "ambiguous",
            Self::NotFound => "not-found",
            Self::Error { .. } => "error",
        }
    }
}

/// The subset of [`Outcome`] that is allowed into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StoredOutcome {
    /// Exactly one authoritative match.
    Resolved {
        /// Stable URI of the authority record.
        uri: String,
        /// The authoritative form of the heading.
        label: String,
    },
    /// Multiple candidates, reusable verbatim on later lookups.
    Ambiguous {
        /// All candidates, in service order.
        candidates: Vec<Candidate>,
    },
    /// Zero matches; cached so the service is never asked again.
    NotFound,
}

impl From<StoredOutcome> for Outcome {
    fn from(stored: StoredOutcome) -> Self {
        match stored {
            StoredOutcome::Resolved { uri, label } => Self::Resolved { uri, label },
            StoredOutcome::Ambiguous { candidates } => Self::Ambiguous { candidates },
            StoredOutcome::NotFound => Self::NotFound,
        }
    }
}

/// The persisted outcome of resolving one `(kind, normalized key)` pair.
///
/// Records have unbounded lifetime: once written, later runs reuse them
/// instead of re-querying the service. `put` overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// The heading kind this record was resolved under.
    pub kind: HeadingKind,
    /// The normalized heading text.
    pub key: String,
    /// What the service said.
    #[serde(flatten)]
    pub outcome: StoredOutcome,
    /// When the resolution happened.
    pub resolved_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Creates a record timestamped now.
    #[must_use]
    pub fn new(kind: HeadingKind, key: impl Into<String>, outcome: StoredOutcome) -> Self {
        Self {
            kind,
            key: key.into(),
            outcome,
            resolved_at: Utc::now(),
        }
    }
}
