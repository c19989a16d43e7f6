//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, public origin)
//!     → issue.rs   POST /api/image-proxy/token  (authenticated)
//!     → proxy.rs   GET  /image-proxy/{token}    (public)
//!     → response.rs (stream upstream body, generic rejections)
//!     → Send to client
//! ```

pub mod issue;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use issue::{IssueRequest, IssueResponse};
pub use request::X_REQUEST_ID;
pub use server::{AppState, BuildError, HttpServer, ServerBuilder, ISSUE_PATH, PROXY_PATH};
