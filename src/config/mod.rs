//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (IMAGE_PROXY_* environment overlay)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; rotating the secret means a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, ListenerConfig, ObservabilityConfig, OriginConfig, ProxyConfig, RateLimitConfig,
    RateLimitRule, SecurityConfig, SigningConfig, TlsConfig, UpstreamConfig,
};
pub use validation::ValidationError;
