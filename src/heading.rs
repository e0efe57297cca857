//! Heading classification.
//!
//! A heading's kind determines which authority service resolves it and
//! partitions the cache: the same text under two kinds is two cache entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a heading, derived from the document element it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingKind {
    /// A topical subject heading (e.g. `United States--History`).
    Subject,
    /// A personal or family name (e.g. `Stevenson, Adlai`).
    PersonalName,
    /// A corporate body name (e.g. `Library of Congress`).
    CorporateName,
}

impl HeadingKind {
    /// True for the name kinds served by the search-style authority.
    #[must_use]
    pub const fn is_name(self) -> bool {
        matches!(self, Self::PersonalName | Self::CorporateName)
    }

    /// Stable lowercase tag, used in log lines and cache keys on disk.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::PersonalName => "personal-name",
            Self::CorporateName => "corporate-name",
        }
    }
}

impl fmt::Display for HeadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
