//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the image proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Token signing settings.
    pub signing: SigningConfig,

    /// Where root-relative locators resolve.
    pub origin: OriginConfig,

    /// Outbound fetch settings.
    pub upstream: UpstreamConfig,

    /// Caller authentication for the issuance endpoint.
    pub auth: AuthConfig,

    /// Rate limiting per endpoint.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC secret. Required; startup fails when empty.
    pub secret: String,

    /// Token lifetime when the caller does not ask for one.
    pub default_ttl_secs: u64,

    /// Upper bound on any requested lifetime.
    pub max_ttl_secs: u64,

    /// Hosts absolute locators may point at. Empty means any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            default_ttl_secs: 300,
            max_ttl_secs: 3600,
            allowed_hosts: Vec::new(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("max_ttl_secs", &self.max_ttl_secs)
            .field("allowed_hosts", &self.allowed_hosts)
            .finish()
    }
}

/// Public origin of the storefront.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL root-relative locators resolve against (e.g.
    /// "https://shop.example.com"). When unset, the issuance request's own
    /// scheme and host are used.
    pub public_base_url: Option<String>,

    /// Honour X-Forwarded-Proto / X-Forwarded-Host when deriving the origin.
    pub trust_forwarded_headers: bool,
}

/// Outbound fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed until upstream response headers arrive.
    pub first_byte_timeout_secs: u64,

    /// Ceiling on the whole transfer, body included.
    pub total_timeout_secs: u64,

    /// User-Agent sent upstream.
    pub user_agent: String,

    /// Cache-Control used when the upstream sends none.
    pub default_cache_control: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            first_byte_timeout_secs: 10,
            total_timeout_secs: 30,
            user_agent: concat!("image-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            default_cache_control: "public, max-age=3600".to_string(),
        }
    }
}

/// Issuance authentication.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer keys accepted on the issuance endpoint.
    pub api_keys: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .finish()
    }
}

/// Rate limits for each endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Keyed by authenticated caller.
    pub issuance: RateLimitRule,

    /// Keyed by client IP.
    pub proxy: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            issuance: RateLimitRule {
                enabled: false,
                requests_per_second: 10,
                burst_size: 20,
            },
            proxy: RateLimitRule {
                enabled: false,
                requests_per_second: 100,
                burst_size: 200,
            },
        }
    }
}

/// A single token-bucket rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitRule {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per key.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// Maximum issuance request body size in bytes.
    pub max_body_size: usize,

    /// Timeout for the issuance handler in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 16 * 1024, // 16KB
            request_timeout_secs: 10,
        }
    }
}
