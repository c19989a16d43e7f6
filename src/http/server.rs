//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, auth, rate limits)
//! - Build the signer, verifier and upstream client from configuration
//! - Bind server to listener (plain or TLS) with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::ProxyConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::{issue, proxy};
use crate::security::auth::{require_caller, BearerKeyAuthenticator, CallerAuthenticator};
use crate::security::headers::security_header_layers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::token::{Clock, HostPolicy, MissingSecret, SystemClock, TokenSigner, Verifier};
use crate::upstream::UpstreamClient;

/// Path of the issuance endpoint.
pub const ISSUE_PATH: &str = "/api/image-proxy/token";
/// Prefix of the proxy endpoint.
pub const PROXY_PATH: &str = "/image-proxy";

/// Time in-flight TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to assemble the server from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    MissingSecret(#[from] MissingSecret),

    #[error("signing.allowed_hosts is set but origin.public_base_url is missing or invalid")]
    MissingPublicOrigin,

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub signer: Arc<TokenSigner>,
    pub verifier: Verifier,
    pub upstream: UpstreamClient,
    /// Scheme assumed for the request origin when nothing says otherwise.
    pub default_scheme: &'static str,
    pub public_base_url: Option<Url>,
    pub default_cache_control: HeaderValue,
}

/// Builder for [`HttpServer`] with replaceable collaborators.
pub struct ServerBuilder {
    config: ProxyConfig,
    authenticator: Option<Arc<dyn CallerAuthenticator>>,
    clock: Arc<dyn Clock>,
}

impl ServerBuilder {
    /// Replace the config-driven bearer key check.
    pub fn authenticator(mut self, authenticator: Arc<dyn CallerAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Replace the wall clock used for token expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<HttpServer, BuildError> {
        let config = self.config;
        let signer = Arc::new(TokenSigner::with_clock(&config.signing.secret, self.clock)?);

        let public_base_url = config
            .origin
            .public_base_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok());
        let policy = HostPolicy::new(&config.signing.allowed_hosts)
            .with_origin(public_base_url.as_ref());
        // Root-relative tokens are only fetchable from a configured origin.
        if policy.is_restricted() && public_base_url.is_none() {
            return Err(BuildError::MissingPublicOrigin);
        }
        if !policy.is_restricted() {
            tracing::warn!(
                "signing.allowed_hosts is empty; absolute locators to any host will be proxied"
            );
        }
        let verifier = Verifier::new(signer.clone(), Arc::new(policy));

        let upstream = UpstreamClient::new(&config.upstream)?;
        let default_cache_control = HeaderValue::from_str(&config.upstream.default_cache_control)
            .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=3600"));

        let authenticator = self
            .authenticator
            .unwrap_or_else(|| Arc::new(BearerKeyAuthenticator::new(&config.auth.api_keys)));

        let state = AppState {
            default_scheme: if config.listener.tls.is_some() { "https" } else { "http" },
            config: Arc::new(config),
            signer,
            verifier,
            upstream,
            public_base_url,
            default_cache_control,
        };

        let router = HttpServer::build_router(state.clone(), authenticator);
        Ok(HttpServer { router, state })
    }
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ProxyConfig) -> ServerBuilder {
        ServerBuilder {
            config,
            authenticator: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, authenticator: Arc<dyn CallerAuthenticator>) -> Router {
        let config = state.config.clone();

        let mut issuance = Router::new().route(ISSUE_PATH, post(issue::issue_token));
        if config.rate_limit.issuance.enabled {
            let limiter = Arc::new(RateLimiterState::new("issue", &config.rate_limit.issuance));
            issuance =
                issuance.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }
        let issuance = issuance
            .layer(middleware::from_fn_with_state(authenticator, require_caller))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.security.request_timeout_secs,
            )));

        let mut proxy = Router::new()
            .route(&format!("{PROXY_PATH}/{{token}}"), get(proxy::proxy_by_path))
            .route(PROXY_PATH, get(proxy::proxy_by_query))
            .route(&format!("{PROXY_PATH}/"), get(proxy::proxy_by_query));
        if config.rate_limit.proxy.enabled {
            let limiter = Arc::new(RateLimiterState::new("proxy", &config.rate_limit.proxy));
            proxy = proxy.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let mut router = Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .merge(issuance)
            .merge(proxy)
            .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
            .with_state(state);

        if config.security.enable_headers {
            for layer in security_header_layers() {
                router = router.layer(layer);
            }
        }

        // Spans carry the matched route, never the raw URI: it holds the token.
        router
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let route = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or("unmatched");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    route = %route,
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
