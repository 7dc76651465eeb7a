// src/test_server.rs
// =============================================================================
// A tiny HTTP/1.1 server for tests, built on tokio's TcpListener.
//
// It serves a fixed table of routes (directory listings, file bodies,
// error statuses) on 127.0.0.1 and counts requests per path, so tests can
// exercise real network code without touching the internet.
// =============================================================================

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with an HTML body
    Page(String),
    /// 200 with a binary body
    File(Vec<u8>),
    /// Empty response with this status
    Status(u16),
    /// Close the connection without answering the first n requests
    FailFirst(usize, Box<Route>),
    /// 302 to this location
    Redirect(String),
    /// Accept the request and never answer
    Stall,
}

pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let routes: Arc<HashMap<String, Route>> =
            Arc::new(routes.into_iter().map(|(path, route)| (path.to_string(), route)).collect());
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let task = tokio::spawn({
            let hits = hits.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(handle(stream, routes.clone(), hits.clone()));
                }
            }
        });

        Self { addr, hits, task }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, Route>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target).to_string();

    let count = {
        let mut hits = hits.lock().unwrap();
        let count = hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let mut route = routes.get(&path).cloned().unwrap_or(Route::Status(404));
    if let Route::FailFirst(failures, then) = route {
        if count <= failures {
            return;
        }
        route = *then;
    }

    let mut location = String::new();
    let (status, content_type, body) = match route {
        Route::Page(html) => (200, "text/html", html.into_bytes()),
        Route::File(bytes) => (200, "application/octet-stream", bytes),
        Route::Status(code) => (code, "text/plain", Vec::new()),
        Route::Redirect(target) => {
            location = format!("Location: {}\r\n", target);
            (302, "text/plain", Vec::new())
        }
        Route::Stall => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return;
        }
        Route::FailFirst(..) => return,
    };

    let reason = if status == 200 { "OK" } else { "Error" };
    let header = format!(
        "HTTP/1.1 {} {}\r\n{}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        location,
        content_type,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes()).await;
    let _ = stream.write_all(&body).await;
    let _ = stream.shutdown().await;
}
