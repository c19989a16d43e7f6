//! Outbound HTTP client with deadlines.

use std::time::Duration;

use reqwest::{redirect, Client, Response, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::security::headers::outbound_headers;
use crate::upstream::transport::Transport;

/// Why an upstream fetch produced no usable response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("upstream unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream returned {0}")]
    ErrorStatus(StatusCode),
}

impl UpstreamError {
    /// Stable tag for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::UnsupportedScheme(_) => "unsupported-scheme",
            UpstreamError::Unreachable(_) => "upstream-unreachable",
            UpstreamError::Timeout(_) => "upstream-timeout",
            UpstreamError::ErrorStatus(_) => "upstream-error-status",
        }
    }
}

/// Fetches authorized resources. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    plain: Client,
    tls: Client,
    first_byte_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let build = |https_only: bool| {
            Client::builder()
                .default_headers(outbound_headers(&config.user_agent))
                .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
                .timeout(Duration::from_secs(config.total_timeout_secs))
                .redirect(redirect::Policy::none())
                .referer(false)
                .no_proxy()
                .https_only(https_only)
                .build()
        };

        Ok(Self {
            plain: build(false)?,
            tls: build(true)?,
            first_byte_timeout: Duration::from_secs(config.first_byte_timeout_secs),
        })
    }

    fn client_for(&self, transport: Transport) -> &Client {
        match transport {
            Transport::Plain => &self.plain,
            Transport::Tls => &self.tls,
        }
    }

    /// GET `url` and return the response once its headers arrive.
    ///
    /// Only 2xx responses are returned; anything else becomes
    /// [`UpstreamError::ErrorStatus`] and its body is discarded. The returned
    /// response's body is still bounded by the total timeout.
    pub async fn fetch(&self, url: &Url) -> Result<Response, UpstreamError> {
        let transport = Transport::for_url(url)
            .ok_or_else(|| UpstreamError::UnsupportedScheme(url.scheme().to_string()))?;

        let request = self.client_for(transport).get(url.clone()).send();
        let response = match tokio::time::timeout(self.first_byte_timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() && !e.is_connect() => {
                return Err(UpstreamError::Timeout(self.first_byte_timeout))
            }
            Ok(Err(e)) => return Err(UpstreamError::Unreachable(e)),
            Err(_) => return Err(UpstreamError::Timeout(self.first_byte_timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::ErrorStatus(status));
        }

        tracing::debug!(
            transport = transport.as_str(),
            status = %status,
            content_length = ?response.content_length(),
            "Upstream responded"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unsupported_schemes() {
        let client = UpstreamClient::new(&UpstreamConfig::default()).unwrap();
        let err = client
            .fetch(&Url::parse("ftp://files.example.com/a.png").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::UnsupportedScheme(ref s) if s == "ftp"));
        assert_eq!(err.kind(), "unsupported-scheme");
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(&UpstreamConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/a.png")).unwrap();
        let err = client.fetch(&url).await.unwrap_err();
        assert_eq!(err.kind(), "upstream-unreachable");
    }

    #[tokio::test]
    async fn stalled_upstream_hits_first_byte_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold connections open without answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = UpstreamConfig {
            first_byte_timeout_secs: 1,
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::new(&config).unwrap();
        let url = Url::parse(&format!("http://{addr}/a.png")).unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch(&url).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
