//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Issuance request:
//!     → auth.rs (bearer check, attach Caller)
//!     → rate_limit.rs (per-caller bucket)
//!     → handler
//!
//! Proxy request:
//!     → rate_limit.rs (per-IP bucket)
//!     → handler (token verification)
//!     → headers.rs (fixed outbound headers, security response headers)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: issuance re-checks the host policy the proxy enforces
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod auth;
pub mod headers;
pub mod rate_limit;
