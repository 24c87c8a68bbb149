#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use firestore_rest::{Firestore, FirestoreSettings, RetrySettings};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const DOCS: &str = "/v1/projects/food-rescue/databases/(default)/documents";

pub fn document_name(path: &str) -> String {
    format!("projects/food-rescue/databases/(default)/documents/{path}")
}

/// Emulator-style client (no credentials) pointed at `host`.
pub fn emulator_firestore(host: &str, max_attempts: usize) -> Firestore {
    let retry = RetrySettings::default()
        .with_max_attempts(max_attempts)
        .with_initial_delay(Duration::from_millis(5));
    Firestore::new(
        FirestoreSettings::new("food-rescue")
            .with_emulator_host(host)
            .with_retry_settings(retry),
    )
    .expect("emulator client")
}

/// HTTP server that answers the n-th request with the n-th scripted response,
/// repeating the last one once the script runs out.
pub struct ScriptedServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl ScriptedServer {
    pub async fn start(script: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(script);

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script[index.min(script.len() - 1)].clone();
                tokio::spawn(respond(stream, status, body));
            }
        });

        Self { addr, hits }
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn respond(mut stream: TcpStream, status: u16, body: String) {
    let mut request = Vec::new();
    let mut buffer = [0u8; 4096];
    loop {
        let read = match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        request.extend_from_slice(&buffer[..read]);
        if let Some(header_end) = find_header_end(&request) {
            let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    let response = format!(
        "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find_header_end(request: &[u8]) -> Option<usize> {
    request.windows(4).position(|window| window == b"\r\n\r\n")
}
