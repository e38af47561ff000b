//! Origin allow-list.

use std::collections::HashSet;
use thiserror::{Error as ThisError};
use url::Url;

/// Marker in the allowed subdomains that allows any subdomain.
pub const ANY_SUBDOMAIN: &str = "*";

/// Why an origin was rejected.
#[derive(Debug, ThisError, Eq, PartialEq)]
pub enum OriginError {
    /// No `Origin` header.
    #[error("missing origin")]
    Missing,
    /// `Origin` is not a URL with a host.
    #[error("malformed origin: {0}")]
    Malformed(String),
    /// Host is outside the allowed domain.
    #[error("origin host {0} is outside the allowed domain")]
    ForeignDomain(String),
    /// Subdomain is not allow-listed.
    #[error("subdomain {0} is not allowed")]
    SubdomainNotAllowed(String),
}

/// Guard that accepts origins under a domain.
///
/// Only subdomains are accepted; the bare domain itself is not.
#[derive(Clone, Debug)]
pub struct OriginGuard {
    domain: String,
    subdomains: HashSet<String>,
    any_subdomain: bool,
}

impl OriginGuard {
    /// Creates a guard for a domain and a set of allowed subdomains.
    ///
    /// [`ANY_SUBDOMAIN`] among `subdomains` allows every subdomain.
    /// Names are compared case-insensitively.
    pub fn new<I, S>(domain: impl Into<String>, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subdomains: HashSet<String> = subdomains.into_iter()
            .map(|s| s.as_ref().trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let any_subdomain = subdomains.contains(ANY_SUBDOMAIN);
        Self {
            domain: domain.into().trim().trim_start_matches('.').to_ascii_lowercase(),
            subdomains,
            any_subdomain,
        }
    }

    /// Returns the allowed domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Checks the value of an `Origin` header.
    pub fn check(&self, origin: Option<&str>) -> Result<(), OriginError> {
        let origin = origin
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .ok_or(OriginError::Missing)?;
        let host = parse_origin_host(origin)?;
        if !host.ends_with(&format!(".{}", self.domain)) {
            return Err(OriginError::ForeignDomain(host));
        }
        if self.any_subdomain {
            return Ok(());
        }
        let subdomain = host.split('.').next().unwrap_or_default();
        if self.subdomains.contains(subdomain) {
            Ok(())
        } else {
            Err(OriginError::SubdomainNotAllowed(subdomain.to_string()))
        }
    }
}

// Extracts the host of an origin.
//
// The scheme separator is required so that a bare host is not mistaken for a
// URL with a custom scheme.
fn parse_origin_host(origin: &str) -> Result<String, OriginError> {
    if !origin.contains("://") {
        return Err(OriginError::Malformed(origin.to_string()));
    }
    let url = Url::parse(origin)
        .map_err(|_| OriginError::Malformed(origin.to_string()))?;
    url.host_str()
        .map(|host| host.trim_end_matches('.').to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| OriginError::Malformed(origin.to_string()))
}
