//! End-to-end tests: EAD record in, enriched EAD record out.
//!
//! The authority services are stubbed at the client seam; everything else
//! (normalization, cache, resolver, orchestrator, XML adapter) is real.

use std::collections::HashMap;
use std::sync::Mutex;

use authlink::{
    open_cache, process_document, AuthorityClient, Candidate, EadDocument, HeadingKind,
    MemoryCache, Outcome, ProcessOptions, Resolver, SelectionRules,
};
use tempfile::tempdir;

/// Client answering from a fixed table and counting calls.
struct TableClient {
    table: HashMap<String, Outcome>,
    calls: Mutex<usize>,
}

impl TableClient {
    fn new(rows: &[(&str, Outcome)]) -> Self {
        Self {
            table: rows
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl AuthorityClient for TableClient {
    fn resolve(&self, _kind: HeadingKind, heading: &str) -> Outcome {
        *self.calls.lock().unwrap() += 1;
        self.table
            .get(heading)
            .cloned()
            .unwrap_or(Outcome::NotFound)
    }
}

fn resolved(uri: &str, label: &str) -> Outcome {
    Outcome::Resolved {
        uri: uri.to_string(),
        label: label.to_string(),
    }
}

const STEVENSON_RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ead xmlns="urn:isbn:1-931666-22-9">
  <eadheader><eadid>mss-0007</eadid></eadheader>
  <archdesc level="collection">
    <controlaccess>
      <persname>Stevenson, Adlai</persname>
    </controlaccess>
  </archdesc>
</ead>"#;

#[test]
fn test_stevenson_end_to_end() {
    let cache = MemoryCache::new();
    let names = TableClient::new(&[(
        "Stevenson, Adlai",
        resolved("http://viaf.org/viaf/12345", "Stevenson, Adlai, 1900-1965"),
    )]);
    let subjects = TableClient::new(&[]);
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_str(STEVENSON_RECORD, SelectionRules::default()).unwrap();
    let report = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.relabeled, 1);

    let xml = doc.to_xml().unwrap();
    assert!(xml.contains(r#"authfilenumber="http://viaf.org/viaf/12345""#));
    assert!(xml.contains(">Stevenson, Adlai, 1900-1965</persname>"));
    assert!(xml.contains("<!--Content was: Stevenson, Adlai-->"));
}

#[test]
fn test_partial_failure_still_resolves_the_rest() {
    let record = r#"<ead>
  <archdesc>
    <controlaccess>
      <persname>First, Good</persname>
      <persname>Broken, Lookup</persname>
      <persname>Third, Fine</persname>
    </controlaccess>
  </archdesc>
</ead>"#;

    let cache = MemoryCache::new();
    let names = TableClient::new(&[
        ("First, Good", resolved("http://viaf.org/viaf/10", "First, Good")),
        ("Broken, Lookup", Outcome::error("upstream 503")),
        ("Third, Fine", resolved("http://viaf.org/viaf/30", "Third, Fine")),
    ]);
    let subjects = TableClient::new(&[]);
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_str(record, SelectionRules::default()).unwrap();
    let report = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].text, "Broken, Lookup");

    let xml = doc.to_xml().unwrap();
    assert!(xml.contains(r#"authfilenumber="http://viaf.org/viaf/10">First, Good"#));
    assert!(xml.contains(r#"authfilenumber="http://viaf.org/viaf/30">Third, Fine"#));
    // The failed node is untouched.
    assert!(xml.contains("<persname>Broken, Lookup</persname>"));
}

#[test]
fn test_ambiguous_heading_is_annotated_not_linked() {
    let record = r#"<ead>
  <archdesc>
    <controlaccess>
      <persname>Smith, John</persname>
    </controlaccess>
  </archdesc>
</ead>"#;

    let cache = MemoryCache::new();
    let names = TableClient::new(&[(
        "Smith, John",
        Outcome::Ambiguous {
            candidates: vec![
                Candidate::new("http://viaf.org/viaf/1", "Smith, John, 1900-1960"),
                Candidate::new("http://viaf.org/viaf/2", "Smith, John, 1931-"),
            ],
        },
    )]);
    let subjects = TableClient::new(&[]);
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_str(record, SelectionRules::default()).unwrap();
    let options = ProcessOptions {
        annotate_ambiguous: true,
    };
    let report = process_document(&resolver, &mut doc, &options).unwrap();

    assert_eq!(report.ambiguous, 1);
    assert_eq!(report.resolved, 0);

    let xml = doc.to_xml().unwrap();
    assert!(!xml.contains("authfilenumber"));
    assert!(xml.contains("http://viaf.org/viaf/1 : Smith, John, 1900-1960"));
    assert!(xml.contains("http://viaf.org/viaf/2 : Smith, John, 1931-"));
}

/// Re-running over an already-enriched record selects nothing and calls
/// no service; resolving a fresh copy of the record hits the persistent
/// cache instead of the network.
#[test]
fn test_rerun_and_cache_reuse() {
    let dir = tempdir().unwrap();

    let names = TableClient::new(&[(
        "Stevenson, Adlai",
        resolved("http://viaf.org/viaf/12345", "Stevenson, Adlai, 1900-1965"),
    )]);
    let subjects = TableClient::new(&[]);

    // First run: one network call, record enriched.
    let enriched = {
        let cache = open_cache(dir.path(), None).unwrap();
        let resolver = Resolver::new(&cache, &subjects, &names);
        let mut doc =
            EadDocument::from_str(STEVENSON_RECORD, SelectionRules::default()).unwrap();
        process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();
        doc.to_xml().unwrap()
    };
    assert_eq!(names.calls(), 1);

    // Second run over the enriched output: zero candidates, zero calls.
    {
        let cache = open_cache(dir.path(), None).unwrap();
        let resolver = Resolver::new(&cache, &subjects, &names);
        let mut doc = EadDocument::from_str(&enriched, SelectionRules::default()).unwrap();
        let report = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();
        assert_eq!(report.processed, 0);
    }
    assert_eq!(names.calls(), 1);

    // Third run over a fresh copy of the original: served from cache.
    {
        let cache = open_cache(dir.path(), None).unwrap();
        let resolver = Resolver::new(&cache, &subjects, &names);
        let mut doc =
            EadDocument::from_str(STEVENSON_RECORD, SelectionRules::default()).unwrap();
        let report = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.resolved, 1);
    }
    assert_eq!(names.calls(), 1);
}

/// A relabeled subject leaves its normalized original, double hyphens and
/// all, in an audit comment — and the output must still be parseable.
#[test]
fn test_relabeled_subject_output_is_well_formed() {
    let record = r#"<ead>
  <archdesc>
    <controlaccess>
      <subject>United States -- History.</subject>
    </controlaccess>
  </archdesc>
</ead>"#;

    let cache = MemoryCache::new();
    let subjects = TableClient::new(&[(
        "United States--History",
        resolved(
            "http://id.loc.gov/authorities/subjects/sh85140098",
            "United States--History--Sources",
        ),
    )]);
    let names = TableClient::new(&[]);
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_str(record, SelectionRules::default()).unwrap();
    let report = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();
    assert_eq!(report.relabeled, 1);

    let xml = doc.to_xml().unwrap();
    assert!(xml.contains(">United States--History--Sources</subject>"));
    assert!(xml.contains("<!--Content was: United States- -History-->"));

    let reparsed = EadDocument::from_str(&xml, SelectionRules::default()).unwrap();
    assert!(reparsed.to_xml().unwrap().contains("United States- -History"));
}

/// Not-found headings are cached and never mutate the record.
#[test]
fn test_not_found_caching_leaves_record_unchanged() {
    let record = r#"<ead><archdesc><controlaccess><subject>Invented Subject</subject></controlaccess></archdesc></ead>"#;

    let cache = MemoryCache::new();
    let subjects = TableClient::new(&[("Invented Subject", Outcome::NotFound)]);
    let names = TableClient::new(&[]);
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_str(record, SelectionRules::default()).unwrap();
    let before = doc.to_xml().unwrap();

    let first = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();
    let second = process_document(&resolver, &mut doc, &ProcessOptions::default()).unwrap();

    assert_eq!(first.not_found, 1);
    assert_eq!(second.not_found, 1);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(subjects.calls(), 1);
    assert_eq!(doc.to_xml().unwrap(), before);
}
