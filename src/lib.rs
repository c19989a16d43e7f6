//! Signed image access proxy.
//!
//! Authenticated callers mint short-lived, tamper-evident tokens for a single
//! image locator; anyone holding a token can fetch that image through the
//! public proxy endpoint without learning the origin URL.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod token;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
