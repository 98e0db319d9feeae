//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, Uri},
    Router,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use path_proxy::{HttpProxy, HttpServer, ProxyConfig, Shutdown};

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Everything a mock backend received.
#[derive(Default)]
pub struct Recorder {
    calls: AtomicU32,
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Seen> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn uris(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.uri.clone()).collect()
    }
}

/// Start an echo backend on an ephemeral port.
///
/// Answers with the request body verbatim, or `{}` when the body is empty
/// (so GETs come back as valid JSON).
pub async fn start_echo_backend() -> (SocketAddr, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());

    async fn echo(
        State(recorder): State<Arc<Recorder>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Bytes {
        recorder.calls.fetch_add(1, Ordering::SeqCst);
        recorder.seen.lock().unwrap().push(Seen {
            method,
            uri: uri.to_string(),
            headers,
            body: body.clone(),
        });
        if body.is_empty() {
            Bytes::from_static(b"{}")
        } else {
            body
        }
    }

    let app = Router::new()
        .fallback(echo)
        .layer(DefaultBodyLimit::disable())
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, recorder)
}

/// Start a raw backend that always writes the same status line and body.
pub async fn start_fixed_backend(status_line: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a raw keep-alive backend answering `{}` to every request.
///
/// The counter is the number of accepted TCP connections.
pub async fn start_keepalive_backend() -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let response = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}";
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    (addr, accepted)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Run the standalone server for `config`; trigger the returned handle to stop it.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(HttpProxy::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Proxy middleware over a fallback that counts how often it runs.
pub fn with_counting_fallback(proxy: HttpProxy) -> (Router, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let app = Router::new()
        .fallback(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "local"
            }
        })
        .layer(axum::middleware::from_fn_with_state(
            proxy,
            path_proxy::proxy_middleware,
        ));
    (app, hits)
}
