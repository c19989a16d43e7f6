//! Host authorization policy.

use std::collections::HashSet;

use url::{Origin, Url};

use crate::token::verifier::VerifyError;

/// True for same-origin paths such as `/uploads/a.png`.
///
/// Protocol-relative (`//host/x`) and backslash forms (`/\host/x`) are excluded
/// because browsers and URL parsers resolve them to another host.
pub fn is_root_relative(locator: &str) -> bool {
    let mut chars = locator.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/') | Some('\\'))
}

/// Decides which locators may be proxied.
///
/// An empty allow-list places no restriction on absolute locators.
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    allowed_hosts: HashSet<String>,
    origin: Option<Origin>,
}

impl HostPolicy {
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| normalize_host(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
            origin: None,
        }
    }

    /// Trust the public origin that resolved root-relative locators point at.
    ///
    /// Matching is on scheme, host and port together; other ports on the same
    /// host still go through the allow-list.
    pub fn with_origin(mut self, base: Option<&Url>) -> Self {
        self.origin = base.map(Url::origin).filter(Origin::is_tuple);
        self
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed_hosts.is_empty()
    }

    pub fn allowed_hosts(&self) -> impl Iterator<Item = &str> {
        self.allowed_hosts.iter().map(String::as_str)
    }

    /// Check a decoded locator.
    pub fn check(&self, locator: &str) -> Result<(), VerifyError> {
        if is_root_relative(locator) {
            return Ok(());
        }
        let url = Url::parse(locator).map_err(|_| VerifyError::BadUrl)?;
        let host = url.host_str().ok_or(VerifyError::BadUrl)?;
        if !self.is_restricted() {
            return Ok(());
        }
        if self.origin.as_ref() == Some(&url.origin())
            || self.allowed_hosts.contains(&normalize_host(host))
        {
            Ok(())
        } else {
            Err(VerifyError::HostNotAllowed)
        }
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
