//! Outbound fetch subsystem.
//!
//! # Data Flow
//! ```text
//! verified locator
//!     → transport.rs (scheme → plain or TLS-only client)
//!     → client.rs (fixed headers, first-byte deadline, total deadline)
//!     → streaming response handed back to the proxy handler
//! ```
//!
//! # Design Decisions
//! - Every outbound call has connect, first-byte and total deadlines
//! - Redirects are never followed; a redirect could leave the allow-list
//! - Dropping the response (client disconnect) closes the upstream connection

pub mod client;
pub mod transport;

pub use client::{UpstreamClient, UpstreamError};
pub use transport::Transport;
