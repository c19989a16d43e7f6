//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image_proxy::config::ProxyConfig;
use image_proxy::http::HttpServer;
use image_proxy::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const SECRET: &str = "integration-secret";
pub const API_KEY: &str = "test-key";
pub const ORIGIN_ERROR_BODY: &str = "origin-internal-error-page";

/// A canned origin response.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub cache_control: Option<&'static str>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn image(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            cache_control: None,
            body: body.to_vec(),
        }
    }

    pub fn with_cache_control(mut self, value: &'static str) -> Self {
        self.cache_control = Some(value);
        self
    }
}

/// A mock origin server that records the head of every request it receives.
pub struct MockOrigin {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockOrigin {
    /// Raw request heads (request line + headers), in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a mock origin serving `routes`; any other path gets a 404 whose body
/// is [`ORIGIN_ERROR_BODY`].
pub async fn start_mock_origin(routes: Vec<(&'static str, MockResponse)>) -> MockOrigin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<&'static str, MockResponse>> = Arc::new(routes.into_iter().collect());
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let routes = routes.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(head) = read_head(&mut socket).await else {
                            return;
                        };
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();
                        recorded.lock().unwrap().push(head);

                        let response = routes.get(path.as_str()).cloned().unwrap_or(MockResponse {
                            status: 404,
                            content_type: Some("text/plain"),
                            cache_control: None,
                            body: ORIGIN_ERROR_BODY.as_bytes().to_vec(),
                        });
                        let _ = socket.write_all(&encode_response(&response)).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockOrigin { addr, requests }
}

/// Start an origin that accepts connections and never answers.
pub async fn start_stalled_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start an origin that sends headers, then a chunk every 50ms until the
/// connection breaks. `closed` flips to true once a write fails.
pub async fn start_dripping_origin(closed: Arc<AtomicBool>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed = closed.clone();
            tokio::spawn(async move {
                if read_head(&mut socket).await.is_none() {
                    return;
                }
                let head =
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    closed.store(true, Ordering::SeqCst);
                    return;
                }
                loop {
                    let wrote = socket.write_all(&[0x42; 1024]).await;
                    let flushed = socket.flush().await;
                    if wrote.is_err() || flushed.is_err() {
                        closed.store(true, Ordering::SeqCst);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            });
        }
    });
    addr
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 || buf.len() > 16 * 1024 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn encode_response(response: &MockResponse) -> Vec<u8> {
    let status_text = match response.status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status_text,
        response.body.len()
    );
    if let Some(ct) = response.content_type {
        head.push_str(&format!("Content-Type: {ct}\r\n"));
    }
    if let Some(cc) = response.cache_control {
        head.push_str(&format!("Cache-Control: {cc}\r\n"));
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(&response.body);
    out
}

/// Proxy configuration whose root-relative locators resolve to `origin`.
pub fn test_config(origin: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.signing.secret = SECRET.to_string();
    config.signing.allowed_hosts = vec!["cdn.example.com".to_string()];
    config.origin.public_base_url = Some(format!("http://{origin}"));
    config.auth.api_keys = vec![API_KEY.to_string()];
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// POST to the issuance endpoint with the test API key.
pub async fn issue(
    client: &reqwest::Client,
    proxy: SocketAddr,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("http://{proxy}/api/image-proxy/token"))
        .bearer_auth(API_KEY)
        .json(&body)
        .send()
        .await
        .expect("Proxy unreachable")
}

pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
