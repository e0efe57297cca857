//! Document-side orchestration.
//!
//! The resolution core never touches XML directly: it drives a
//! [`HeadingDocument`], an ordered source of candidate heading nodes that
//! accepts attribute writes, text replacement, and adjacent comment
//! insertion. [`process_document`] walks the candidates in document order,
//! resolves each one, applies the outcome, and aggregates a [`RunReport`].
//! One heading's failure never aborts the rest of the pass.

pub mod ead;

use std::fmt;

use crate::cache::CacheError;
use crate::heading::HeadingKind;
use crate::outcome::Outcome;
use crate::resolver::Resolver;

/// Opaque handle to one heading node inside a document.
pub type NodeId = usize;

/// One candidate heading: where it is, what it says, what kind it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRef {
    /// Node handle for later mutations.
    pub id: NodeId,
    /// The node's raw text content.
    pub text: String,
    /// Which authority serves this heading.
    pub kind: HeadingKind,
}

/// A document exposing heading candidates and accepting mutations.
///
/// Selection of candidates (and the exclusion of nodes that already carry
/// an identifier) is the document's concern; the orchestrator takes the
/// list as given.
pub trait HeadingDocument {
    /// All candidate headings, in document order. May be empty.
    fn candidates(&self) -> Vec<CandidateRef>;

    /// Set the node's authority identifier attribute.
    fn set_authority_uri(&mut self, id: NodeId, uri: &str);

    /// Replace the node's text content.
    fn replace_text(&mut self, id: NodeId, text: &str);

    /// Insert a comment-like annotation adjacent to the node.
    fn annotate(&mut self, id: NodeId, note: &str);
}

/// Mode flags for one orchestration pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Attach an annotation listing every candidate to ambiguous headings.
    pub annotate_ambiguous: bool,
}

/// A heading the service could not answer for, reported rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingFailure {
    /// The heading's normalized text.
    pub text: String,
    /// The heading's kind.
    pub kind: HeadingKind,
    /// What the client reported.
    pub detail: String,
}

/// Aggregated results of one pass over a document's candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Candidates examined.
    pub processed: usize,
    /// Lookups answered from the cache.
    pub cache_hits: usize,
    /// Headings that received an identifier.
    pub resolved: usize,
    /// Resolved headings whose text was rewritten to the authoritative
    /// form.
    pub relabeled: usize,
    /// Headings with multiple candidates and no unique exact match.
    pub ambiguous: usize,
    /// Headings the service affirmatively does not know.
    pub not_found: usize,
    /// Service failures, one per affected heading.
    pub failures: Vec<HeadingFailure>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} headings: {} resolved ({} relabeled), {} ambiguous, {} not found, {} errors, {} cache hits",
            self.processed,
            self.resolved,
            self.relabeled,
            self.ambiguous,
            self.not_found,
            self.failures.len(),
            self.cache_hits
        )
    }
}

/// Resolve every candidate heading in `doc` and apply the outcomes.
///
/// Per candidate, in document order:
/// - `Resolved`: set the identifier attribute; when the authoritative label
///   differs from the normalized original text, also replace the text and
///   leave a comment recording what it was
/// - `Ambiguous`: no identifier; optionally one annotation listing every
///   `uri : label` pair in service order
/// - `NotFound`: untouched
/// - `Error`: untouched, recorded in the report, pass continues
///
/// # Errors
/// Only cache I/O failures abort the pass; they mean later `get`s could
/// silently re-query the network, which the persistence contract forbids.
pub fn process_document(
    resolver: &Resolver<'_>,
    doc: &mut dyn HeadingDocument,
    options: &ProcessOptions,
) -> Result<RunReport, CacheError> {
    let mut report = RunReport::default();

    for candidate in doc.candidates() {
        report.processed += 1;

        let resolution = resolver.resolve_heading(candidate.kind, &candidate.text)?;
        if resolution.from_cache {
            report.cache_hits += 1;
        }

        match resolution.outcome {
            Outcome::Resolved { uri, label } => {
                doc.set_authority_uri(candidate.id, &uri);
                report.resolved += 1;

                if label != resolution.key {
                    log::info!(
                        "changed {} heading {:?} to {label:?}",
                        candidate.kind,
                        resolution.key
                    );
                    doc.replace_text(candidate.id, &label);
                    doc.annotate(candidate.id, &format!("Content was: {}", resolution.key));
                    report.relabeled += 1;
                }
            }
            Outcome::Ambiguous { candidates } => {
                report.ambiguous += 1;
                if options.annotate_ambiguous {
                    let listing = candidates
                        .iter()
                        .map(|c| format!("{} : {}", c.uri, c.label))
                        .collect::<Vec<_>>()
                        .join("; ");
                    doc.annotate(candidate.id, &format!("Ambiguous heading. Candidates: {listing}"));
                }
            }
            Outcome::NotFound => {
                report.not_found += 1;
                log::debug!("no match for {} heading {:?}", candidate.kind, resolution.key);
            }
            Outcome::Error { detail } => {
                log::warn!(
                    "lookup failed for {} heading {:?}: {detail}",
                    candidate.kind,
                    resolution.key
                );
                report.failures.push(HeadingFailure {
                    text: resolution.key,
                    kind: candidate.kind,
                    detail,
                });
            }
        }
    }

    Ok(report)
}
