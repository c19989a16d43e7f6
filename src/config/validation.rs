//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Fail startup on a missing signing secret
//! - Validate value ranges (timeouts > 0, TTL bounds, addresses parse)
//! - An allow-list needs a configured public origin for same-origin tokens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("signing.secret is missing")]
    MissingSecret,
    #[error("signing.default_ttl_secs must be between 1 and signing.max_ttl_secs")]
    DefaultTtlOutOfRange,
    #[error("signing.max_ttl_secs must be greater than zero")]
    ZeroMaxTtl,
    #[error("signing.allowed_hosts contains an invalid entry: {0:?}")]
    InvalidAllowedHost(String),
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("origin.public_base_url must be an absolute http(s) URL: {0}")]
    InvalidPublicBaseUrl(String),
    #[error("origin.public_base_url is required when signing.allowed_hosts is set")]
    MissingPublicBaseUrl,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("upstream.first_byte_timeout_secs must not exceed upstream.total_timeout_secs")]
    FirstByteExceedsTotal,
    #[error("rate_limit.{0} needs requests_per_second and burst_size greater than zero")]
    InvalidRateLimit(&'static str),
    #[error("auth.api_keys contains an empty key")]
    EmptyApiKey,
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let signing = &config.signing;
    if signing.secret.trim().is_empty() {
        errors.push(ValidationError::MissingSecret);
    }
    if signing.max_ttl_secs == 0 {
        errors.push(ValidationError::ZeroMaxTtl);
    }
    if signing.default_ttl_secs == 0 || signing.default_ttl_secs > signing.max_ttl_secs {
        errors.push(ValidationError::DefaultTtlOutOfRange);
    }
    for host in &signing.allowed_hosts {
        if !is_plausible_host(host) {
            errors.push(ValidationError::InvalidAllowedHost(host.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if !signing.allowed_hosts.is_empty() && config.origin.public_base_url.is_none() {
        errors.push(ValidationError::MissingPublicBaseUrl);
    }
    if let Some(base) = &config.origin.public_base_url {
        let valid = Url::parse(base)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidPublicBaseUrl(base.clone()));
        }
    }

    let upstream = &config.upstream;
    for (field, value) in [
        ("upstream.connect_timeout_secs", upstream.connect_timeout_secs),
        ("upstream.first_byte_timeout_secs", upstream.first_byte_timeout_secs),
        ("upstream.total_timeout_secs", upstream.total_timeout_secs),
        ("security.request_timeout_secs", config.security.request_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }
    if upstream.first_byte_timeout_secs > upstream.total_timeout_secs {
        errors.push(ValidationError::FirstByteExceedsTotal);
    }

    for (name, rule) in [
        ("issuance", &config.rate_limit.issuance),
        ("proxy", &config.rate_limit.proxy),
    ] {
        if rule.enabled && (rule.requests_per_second == 0 || rule.burst_size == 0) {
            errors.push(ValidationError::InvalidRateLimit(name));
        }
    }

    if config.auth.api_keys.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Bare hostnames only: no scheme, path, port or whitespace.
fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && !host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '@' | '?' | '#'))
}
