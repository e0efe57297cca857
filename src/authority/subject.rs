//! Subject-authority client.
//!
//! One GET against a label-resolution endpoint, with the normalized
//! heading percent-encoded as the final path segment. The service answers
//! for exactly zero or one record - subjects never come back ambiguous
//! under this protocol. The identifier/label pair arrives either in the
//! `X-URI` / `X-PrefLabel` response headers or, failing that, in the
//! MADS/RDF body the redirect chain lands on.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};

use crate::error::LinkError;
use crate::heading::HeadingKind;
use crate::outcome::Outcome;

use super::{courtesy_pause, AuthorityClient, AuthorityConfig};

/// Client for the label-resolution authority endpoint.
pub struct SubjectAuthority {
    http: Client,
    endpoint: Url,
    delay: Duration,
}

impl SubjectAuthority {
    /// Build a client from the shared configuration.
    ///
    /// # Errors
    /// `LinkError::Config` if the endpoint URL or HTTP client cannot be
    /// constructed.
    pub fn new(config: &AuthorityConfig) -> Result<Self, LinkError> {
        let endpoint = Url::parse(&config.subject_endpoint)
            .map_err(|e| LinkError::config(format!("subject endpoint: {e}")))?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LinkError::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            delay: config.courtesy_delay,
        })
    }

    fn lookup_url(&self, heading: &str) -> Result<Url, String> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| "endpoint cannot take path segments".to_string())?
            .push(heading);
        Ok(url)
    }
}

impl AuthorityClient for SubjectAuthority {
    fn resolve(&self, _kind: HeadingKind, heading: &str) -> Outcome {
        let url = match self.lookup_url(heading) {
            Ok(url) => url,
            Err(detail) => return Outcome::error(detail),
        };

        let response = match self
            .http
            .get(url)
            .header(ACCEPT, "application/xml")
            .send()
        {
            Ok(response) => response,
            // Nothing reached the service; no courtesy delay owed.
            Err(e) => return Outcome::error(format!("transport failure: {e}")),
        };

        let status = response.status();
        let x_uri = header_value(&response, "x-uri");
        let x_label = header_value(&response, "x-preflabel");
        let body = response.text().unwrap_or_default();

        courtesy_pause(self.delay);

        classify_label_response(status, x_uri.as_deref(), x_label.as_deref(), &body)
    }
}

fn header_value(response: &reqwest::blocking::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Classify a label-endpoint response. Pure; exercised directly by tests.
pub(crate) fn classify_label_response(
    status: StatusCode,
    x_uri: Option<&str>,
    x_label: Option<&str>,
    body: &str,
) -> Outcome {
    match status {
        StatusCode::OK => {
            if let (Some(uri), Some(label)) = (x_uri, x_label) {
                return Outcome::Resolved {
                    uri: uri.to_string(),
                    label: label.to_string(),
                };
            }
            match parse_rdf_label(body) {
                Some((uri, label)) => Outcome::Resolved { uri, label },
                None => Outcome::error("200 response carried no identifier/label pair"),
            }
        }
        StatusCode::NOT_FOUND => Outcome::NotFound,
        other => Outcome::error(format!("unexpected status {other}")),
    }
}

/// Pull the record URI and authoritative label out of a MADS/RDF body.
///
/// Namespace prefixes vary between mirrors, so matching is by local name:
/// the URI is the `about` attribute of the first element directly under the
/// document root, the label is the text of the first `authoritativeLabel`.
pub(crate) fn parse_rdf_label(body: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(body);

    let mut uri: Option<String> = None;
    let mut label: Option<String> = None;
    let mut depth = 0usize;
    let mut in_label = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 1 && uri.is_none() {
                    uri = about_attribute(&e);
                }
                if e.local_name().as_ref() == b"authoritativeLabel" && label.is_none() {
                    in_label = true;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 && uri.is_none() {
                    uri = about_attribute(&e);
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                in_label = false;
            }
            Ok(Event::Text(t)) if in_label => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        label = Some(text.to_string());
                        in_label = false;
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        if uri.is_some() && label.is_some() {
            break;
        }
    }

    match (uri, label) {
        (Some(uri), Some(label)) => Some((uri, label)),
        _ => None,
    }
}

fn about_attribute(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"about" {
            if let Ok(value) = attr.unescape_value() {
                return Some(value.into_owned());
            }
        }
    }
    None
}
