//! # authlink - Authority control for EAD finding aids
//!
//! authlink enriches archival finding-aid records by resolving free-text
//! name and subject headings against external authority services, attaching
//! a stable URI to each resolved heading and optionally rewriting the
//! heading to its authoritative form.
//!
//! ## Core Concepts
//!
//! - **Heading**: a name or subject string extracted from a document node,
//!   tagged with a [`HeadingKind`]
//! - **Outcome**: the classified result of one resolution attempt -
//!   resolved, ambiguous, not found, or error
//! - **Cache**: a durable `(kind, normalized key) -> record` store so no
//!   heading is ever sent to a rate-limited service twice
//! - **Orchestrator**: drives the resolver over a document's candidate
//!   nodes and applies mutations and annotations back onto the tree
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authlink::{
//!     open_cache, AuthorityConfig, EadDocument, NameAuthority, ProcessOptions,
//!     Resolver, SelectionRules, SubjectAuthority,
//! };
//!
//! let cache = open_cache("./authority-cache", None)?;
//! let config = AuthorityConfig::default().validate()?;
//! let subjects = SubjectAuthority::new(&config)?;
//! let names = NameAuthority::new(&config)?;
//! let resolver = Resolver::new(&cache, &subjects, &names);
//!
//! let mut doc = EadDocument::from_path("finding-aid.xml", SelectionRules::default())?;
//! let report = authlink::process_document(&resolver, &mut doc, &ProcessOptions::default())?;
//! doc.write_to_path("finding-aid.out.xml")?;
//! println!("{report}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod authority;
pub mod cache;
pub mod document;
pub mod error;
pub mod heading;
pub mod normalize;
pub mod outcome;
pub mod resolver;

// Re-export primary types at crate root for convenience
pub use authority::{AuthorityClient, AuthorityConfig, NameAuthority, SubjectAuthority};
pub use cache::{open_cache, CacheConfig, CacheError, CacheStore, MemoryCache, PersistentCache};
pub use document::ead::{EadDocument, SelectionRule, SelectionRules};
pub use document::{
    process_document, CandidateRef, HeadingDocument, NodeId, ProcessOptions, RunReport,
};
pub use error::{DocumentError, LinkError, LinkResult};
pub use heading::HeadingKind;
pub use normalize::normalize;
pub use outcome::{CacheRecord, Candidate, Outcome, StoredOutcome};
pub use resolver::{Resolution, Resolver};
