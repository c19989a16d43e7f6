//! Signed Image Proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!  caller (authenticated)              client (public)
//!        │ POST /api/image-proxy/token       │ GET /image-proxy/{token}
//!        ▼                                   ▼
//!  security::auth + rate_limit          security::rate_limit
//!        ▼                                   ▼
//!  http::issue                          http::proxy
//!   normalize locator                    token::verifier
//!   token::policy                         ├─ token::codec
//!   token::signer ──── secret ────────────├─ token::signer
//!        │                                └─ token::policy
//!        ▼                                   ▼
//!  { token, expiresAt }                 upstream (plain / TLS) ──▶ origin
//!                                            ▼
//!                                       streamed body
//! ```

use std::path::PathBuf;

use clap::Parser;

use image_proxy::config::load_config;
use image_proxy::lifecycle::{signals, startup};
use image_proxy::observability::logging;
use image_proxy::Shutdown;

#[derive(Parser)]
#[command(name = "image-proxy")]
#[command(about = "Signed image access proxy", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. IMAGE_PROXY_* variables override it.
    #[arg(short, long, env = "IMAGE_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing secret or any other invalid setting stops the process here.
    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("image-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    startup::run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
