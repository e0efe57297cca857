//! Name-authority client.
//!
//! One GET against a union-catalog search endpoint. The query is a
//! structured CQL expression combining the heading, a name-type index
//! (personal or corporate) and a source restriction to the authority's own
//! contributed records. The response is a syndication-style XML feed whose
//! OpenSearch result count drives classification:
//!
//! - count 0: not found
//! - count 1: resolved from the sole entry
//! - count >1: resolved anyway when exactly one entry's label is an exact
//!   string match for the query heading (tie-break), otherwise ambiguous
//!   with the full candidate list in feed order
//!
//! A missing count, an unparsable feed, or any non-200 status is an error.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};

use crate::error::LinkError;
use crate::heading::HeadingKind;
use crate::outcome::{Candidate, Outcome};

use super::{courtesy_pause, AuthorityClient, AuthorityConfig};

/// Client for the union-catalog name search endpoint.
pub struct NameAuthority {
    http: Client,
    endpoint: Url,
    source: String,
    delay: Duration,
}

impl NameAuthority {
    /// Build a client from the shared configuration.
    ///
    /// # Errors
    /// `LinkError::Config` if the endpoint URL or HTTP client cannot be
    /// constructed.
    pub fn new(config: &AuthorityConfig) -> Result<Self, LinkError> {
        let endpoint = Url::parse(&config.name_endpoint)
            .map_err(|e| LinkError::config(format!("name endpoint: {e}")))?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LinkError::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            source: config.name_source.clone(),
            delay: config.courtesy_delay,
        })
    }

    fn search_url(&self, kind: HeadingKind, heading: &str) -> Result<Url, String> {
        let index = match kind {
            HeadingKind::PersonalName => "local.personalNames",
            HeadingKind::CorporateName => "local.corporateNames",
            HeadingKind::Subject => {
                return Err("subject headings are routed to the label service".to_string())
            }
        };

        // CQL strings are double-quoted; embedded quotes take a backslash.
        let term = heading.replace('"', "\\\"");
        let query = format!(
            "{index} all \"{term}\" and local.sources any \"{source}\"",
            source = self.source
        );

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("query", &query);
        Ok(url)
    }
}

impl AuthorityClient for NameAuthority {
    fn resolve(&self, kind: HeadingKind, heading: &str) -> Outcome {
        let url = match self.search_url(kind, heading) {
            Ok(url) => url,
            Err(detail) => return Outcome::error(detail),
        };

        let response = match self
            .http
            .get(url)
            .header(ACCEPT, "application/atom+xml")
            .send()
        {
            Ok(response) => response,
            // Nothing reached the service; no courtesy delay owed.
            Err(e) => return Outcome::error(format!("transport failure: {e}")),
        };

        let status = response.status();
        let body = response.text().unwrap_or_default();

        courtesy_pause(self.delay);

        if status != StatusCode::OK {
            return Outcome::error(format!("unexpected status {status}"));
        }

        match parse_search_feed(&body) {
            Ok(feed) => classify_search_feed(heading, &feed),
            Err(detail) => Outcome::error(detail),
        }
    }
}

/// A parsed search feed: the advertised result count and the entries.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SearchFeed {
    /// Value of the feed's result-count field, if present.
    pub total: Option<u64>,
    /// Identifier/label pairs in feed order.
    pub entries: Vec<Candidate>,
}

/// Parse a syndication feed into count and candidates. Pure.
///
/// Matching is by local name so Atom and RSS flavors both work: the count
/// is `totalResults` (OpenSearch), entries are `entry` or `item` elements
/// carrying a `title` plus a `uri`/`id` child or a `link href`.
pub(crate) fn parse_search_feed(body: &str) -> Result<SearchFeed, String> {
    let mut reader = Reader::from_str(body);

    let mut feed = SearchFeed::default();
    let mut saw_root = false;

    // Per-entry accumulation state
    let mut in_entry = false;
    let mut entry_title: Option<String> = None;
    let mut entry_uri: Option<String> = None;

    // Which text element we are currently inside
    #[derive(Clone, Copy)]
    enum TextTarget {
        None,
        Total,
        Title,
        Uri,
    }
    let mut target = TextTarget::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_root = true;
                match e.local_name().as_ref() {
                    b"totalResults" => target = TextTarget::Total,
                    b"entry" | b"item" => {
                        in_entry = true;
                        entry_title = None;
                        entry_uri = None;
                    }
                    b"title" if in_entry => target = TextTarget::Title,
                    b"uri" | b"id" if in_entry => target = TextTarget::Uri,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                if in_entry && e.local_name().as_ref() == b"link" && entry_uri.is_none() {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"href" {
                            if let Ok(value) = attr.unescape_value() {
                                entry_uri = Some(value.into_owned());
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| format!("bad feed text: {e}"))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match target {
                    TextTarget::Total => {
                        let count = text
                            .parse::<u64>()
                            .map_err(|_| format!("unparsable result count: {text:?}"))?;
                        feed.total = Some(count);
                    }
                    TextTarget::Title => entry_title = Some(text.to_string()),
                    TextTarget::Uri => {
                        if entry_uri.is_none() {
                            entry_uri = Some(text.to_string());
                        }
                    }
                    TextTarget::None => {}
                }
                target = TextTarget::None;
            }
            Ok(Event::End(e)) => {
                target = TextTarget::None;
                if matches!(e.local_name().as_ref(), b"entry" | b"item") && in_entry {
                    in_entry = false;
                    if let (Some(label), Some(uri)) = (entry_title.take(), entry_uri.take()) {
                        feed.entries.push(Candidate { uri, label });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("unparsable feed: {e}")),
            _ => {}
        }
    }

    if !saw_root {
        return Err("empty response body".to_string());
    }

    Ok(feed)
}

/// Turn a parsed feed into an outcome for the queried heading. Pure.
pub(crate) fn classify_search_feed(heading: &str, feed: &SearchFeed) -> Outcome {
    let Some(total) = feed.total else {
        return Outcome::error("response missing result count");
    };

    match total {
        0 => Outcome::NotFound,
        1 => match feed.entries.first() {
            Some(only) => Outcome::Resolved {
                uri: only.uri.clone(),
                label: only.label.clone(),
            },
            None => Outcome::error("result count 1 but no entry in feed"),
        },
        _ => {
            if feed.entries.is_empty() {
                return Outcome::error(format!("result count {total} but no entries in feed"));
            }
            // Exact-label match wins over ambiguity, but only when unique.
            let mut exact = feed.entries.iter().filter(|c| c.label == heading);
            match (exact.next(), exact.next()) {
                (Some(winner), None) => Outcome::Resolved {
                    uri: winner.uri.clone(),
                    label: winner.label.clone(),
                },
                _ => Outcome::Ambiguous {
                    candidates: feed.entries.clone(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_escapes_embedded_quotes() {
        let client = NameAuthority::new(&AuthorityConfig::default()).unwrap();
        let url = client
            .search_url(HeadingKind::PersonalName, r#"Smith, John "Jack""#)
            .unwrap();

        let query = url
            .query_pairs()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        assert_eq!(
            query,
            r#"local.personalNames all "Smith, John \"Jack\"" and local.sources any "lc""#
        );
    }

    #[test]
    fn test_search_url_selects_index_by_kind() {
        let client = NameAuthority::new(&AuthorityConfig::default()).unwrap();

        let url = client
            .search_url(HeadingKind::CorporateName, "Library of Congress")
            .unwrap();
        assert!(url.query().unwrap().contains("corporateNames"));

        assert!(client.search_url(HeadingKind::Subject, "Railroads").is_err());
    }

    fn feed_with(total: u64, entries: &[(&str, &str)]) -> SearchFeed {
        SearchFeed {
            total: Some(total),
            entries: entries
                .iter()
                .map(|(uri, label)| Candidate::new(*uri, *label))
                .collect(),
        }
    }

    const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:os="http://a9.com/-/spec/opensearch/1.1/">
  <title>Search results</title>
  <os:totalResults>2</os:totalResults>
  <entry>
    <title>Smith, John, 1900-1960</title>
    <link href="http://viaf.org/viaf/111"/>
  </entry>
  <entry>
    <title>Smith, John</title>
    <uri>http://viaf.org/viaf/222</uri>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let feed = parse_search_feed(ATOM_FEED).unwrap();
        assert_eq!(feed.total, Some(2));
        assert_eq!(
            feed.entries,
            vec![
                Candidate::new("http://viaf.org/viaf/111", "Smith, John, 1900-1960"),
                Candidate::new("http://viaf.org/viaf/222", "Smith, John"),
            ]
        );
    }

    #[test]
    fn test_parse_feed_without_count() {
        let feed = parse_search_feed("<feed><entry><title>x</title><uri>u</uri></entry></feed>")
            .unwrap();
        assert_eq!(feed.total, None);
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        assert!(parse_search_feed("").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_count() {
        let err =
            parse_search_feed("<feed><totalResults>lots</totalResults></feed>").unwrap_err();
        assert!(err.contains("result count"));
    }

    #[test]
    fn test_count_zero_is_not_found() {
        let outcome = classify_search_feed("Smith, John", &feed_with(0, &[]));
        assert_eq!(outcome, Outcome::NotFound);
    }

    #[test]
    fn test_count_one_resolves_sole_entry() {
        let feed = feed_with(1, &[("http://viaf.org/viaf/12345", "Stevenson, Adlai, 1900-1965")]);
        let outcome = classify_search_feed("Stevenson, Adlai", &feed);
        assert_eq!(
            outcome,
            Outcome::Resolved {
                uri: "http://viaf.org/viaf/12345".to_string(),
                label: "Stevenson, Adlai, 1900-1965".to_string(),
            }
        );
    }

    #[test]
    fn test_exact_label_tie_break() {
        let feed = feed_with(
            3,
            &[
                ("http://viaf.org/viaf/1", "Smith, John, 1900-1960"),
                ("http://viaf.org/viaf/2", "Smith, John"),
                ("http://viaf.org/viaf/3", "Smith, John, 1931-"),
            ],
        );
        let outcome = classify_search_feed("Smith, John", &feed);
        assert_eq!(
            outcome,
            Outcome::Resolved {
                uri: "http://viaf.org/viaf/2".to_string(),
                label: "Smith, John".to_string(),
            }
        );
    }

    #[test]
    fn test_ambiguous_fallback_preserves_order() {
        let entries = [
            ("http://viaf.org/viaf/1", "Smith, John, 1900-1960"),
            ("http://viaf.org/viaf/2", "Smith, John A."),
            ("http://viaf.org/viaf/3", "Smith, John, 1931-"),
        ];
        let outcome = classify_search_feed("Smith, John", &feed_with(3, &entries));
        match outcome {
            Outcome::Ambiguous { candidates } => {
                assert_eq!(candidates.len(), 3);
                assert_eq!(candidates[0].uri, "http://viaf.org/viaf/1");
                assert_eq!(candidates[2].uri, "http://viaf.org/viaf/3");
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_exact_labels_stay_ambiguous() {
        let feed = feed_with(
            2,
            &[
                ("http://viaf.org/viaf/1", "Smith, John"),
                ("http://viaf.org/viaf/2", "Smith, John"),
            ],
        );
        let outcome = classify_search_feed("Smith, John", &feed);
        assert!(matches!(outcome, Outcome::Ambiguous { .. }));
    }

    #[test]
    fn test_missing_count_is_error() {
        let feed = SearchFeed {
            total: None,
            entries: vec![Candidate::new("u", "l")],
        };
        assert!(matches!(
            classify_search_feed("x", &feed),
            Outcome::Error { .. }
        ));
    }

    #[test]
    fn test_count_entry_mismatch_is_error() {
        assert!(matches!(
            classify_search_feed("x", &feed_with(1, &[])),
            Outcome::Error { .. }
        ));
        assert!(matches!(
            classify_search_feed("x", &feed_with(4, &[])),
            Outcome::Error { .. }
        ));
    }
}
