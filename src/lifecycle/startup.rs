//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the metrics exporter
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::{BuildError, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid bind address {0}")]
    BindAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start every subsystem and serve until `shutdown` fires.
pub async fn run(config: ProxyConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        allowed_hosts = config.signing.allowed_hosts.len(),
        default_ttl_secs = config.signing.default_ttl_secs,
        max_ttl_secs = config.signing.max_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let addr: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .map_err(|_| StartupError::BindAddress(config.listener.bind_address.clone()))?;
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }
    Ok(())
}
