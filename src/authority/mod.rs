//! Authority service clients.
//!
//! Two services, one contract: turn a normalized heading into an
//! [`Outcome`]. Transport failures and unintelligible responses come back
//! as `Outcome::Error`, in-band with the other result kinds, so callers
//! have exactly one place to pattern-match.
//!
//! Both clients pause for a fixed courtesy delay after every round trip
//! that produced a response. The services are shared, rate-limited
//! infrastructure; the cache exists so the delay is paid at most once per
//! heading, ever.

mod name;
mod subject;

pub use name::NameAuthority;
pub use subject::SubjectAuthority;

use std::time::Duration;

use crate::error::LinkError;
use crate::heading::HeadingKind;
use crate::outcome::Outcome;

/// A client that resolves one heading per call against a remote authority.
///
/// Implementations are blocking; the engine is single-threaded and issues
/// one request at a time.
pub trait AuthorityClient {
    /// Resolve a normalized heading of the given kind.
    fn resolve(&self, kind: HeadingKind, heading: &str) -> Outcome;
}

/// Endpoints and network policy for the authority clients.
///
/// All service addresses live here rather than in the clients so deployments
/// can point at mirrors or test stands without touching code.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Label-resolution endpoint; the heading is appended as a path
    /// segment.
    pub subject_endpoint: String,
    /// Union-catalog search endpoint; the heading goes into a structured
    /// query.
    pub name_endpoint: String,
    /// Source restriction for name searches (the authority's own
    /// contributed records).
    pub name_source: String,
    /// Fixed pause after each network round trip.
    pub courtesy_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            subject_endpoint: "https://id.loc.gov/vocabulary/subject/label".to_string(),
            name_endpoint: "https://viaf.org/viaf/search".to_string(),
            name_source: "lc".to_string(),
            courtesy_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AuthorityConfig {
    /// Check that the endpoints are absolute URLs and the source filter is
    /// present.
    ///
    /// # Errors
    /// `LinkError::Config` naming the offending field.
    pub fn validate(self) -> Result<Self, LinkError> {
        for (field, value) in [
            ("subject_endpoint", &self.subject_endpoint),
            ("name_endpoint", &self.name_endpoint),
        ] {
            let url = reqwest::Url::parse(value)
                .map_err(|e| LinkError::config(format!("{field} is not a valid URL: {e}")))?;
            if url.cannot_be_a_base() {
                return Err(LinkError::config(format!(
                    "{field} cannot be used as a base URL: {value}"
                )));
            }
        }

        if self.name_source.trim().is_empty() {
            return Err(LinkError::config("name_source must not be empty"));
        }

        Ok(self)
    }
}

/// Sleep for the courtesy delay. Called by clients after each round trip
/// that reached the remote service; never called on cache hits.
pub(crate) fn courtesy_pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(AuthorityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let config = AuthorityConfig {
            subject_endpoint: "/vocabulary/subject/label".to_string(),
            ..AuthorityConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("subject_endpoint"));
    }

    #[test]
    fn test_rejects_empty_source() {
        let config = AuthorityConfig {
            name_source: "  ".to_string(),
            ..AuthorityConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("name_source"));
    }
}
