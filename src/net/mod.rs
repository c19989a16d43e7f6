//! Network layer subsystem.
//!
//! TLS termination is optional; without a `[listener.tls]` section the server
//! speaks plain HTTP and expects a fronting proxy to terminate TLS.

pub mod tls;
