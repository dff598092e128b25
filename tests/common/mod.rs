//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use edge_router::config::ProxyConfig;
use edge_router::edge::{Dispatcher, EdgeSettings};
use edge_router::http::HttpServer;
use edge_router::lifecycle::Shutdown;
use edge_router::routing::Registrar;
use edge_router::store::{KvStore, MemoryStore, StoreError, StoreResult};

/// Start a backend that answers every request with its own request head
/// (request line and headers) as the body.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let head = head.split("\r\n\r\n").next().unwrap_or_default().to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    head.len(),
                    head
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Case-insensitive lookup of a header line in an echoed request head.
pub fn echoed_header(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
    })
}

/// A store whose reads can be switched to fail.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(512, 1024),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    fn max_value_bytes(&self) -> usize {
        self.inner.max_value_bytes()
    }
}

/// A running edge server with its registrar.
pub struct EdgeHarness {
    pub addr: SocketAddr,
    pub registrar: Arc<Registrar>,
    pub dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
}

impl EdgeHarness {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for EdgeHarness {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start an edge server over `store` on an ephemeral port.
pub async fn start_edge(config: ProxyConfig, store: Arc<dyn KvStore>) -> EdgeHarness {
    let registrar = Arc::new(Registrar::new(store.clone(), config.app.clone(), config.router.clone()));
    let dispatcher = Arc::new(Dispatcher::new(store, registrar.namespace(), EdgeSettings::from_config(&config)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, dispatcher.clone()).unwrap();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });

    EdgeHarness {
        addr,
        registrar,
        dispatcher,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
