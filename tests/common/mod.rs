//! Shared utilities for integration tests.
//!
//! A programmable HTTP backend on a raw TCP listener. Every request is
//! recorded; the handler decides status and body.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub query: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    /// Start a backend answering every request with `handler`.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve_one(socket, handler.as_ref(), &recorded).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose path starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }
}

async fn serve_one<F>(
    mut socket: TcpStream,
    handler: &F,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()>
where
    F: Fn(&RecordedRequest) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };
    let request = RecordedRequest { method, path, query, body };
    let (status, response_body) = handler(&request);
    recorded.lock().unwrap().push(request);

    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        response_body.len(),
        response_body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// 128-hex-character key derived from `seed`.
pub fn key_hex(seed: u8) -> String {
    hex::encode([seed; 64])
}

/// A request-service summary entry.
pub fn summary_entry(id: u64, seed: u8, amount: u64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "user_id": 1,
        "public_key": key_hex(seed),
        "amount": amount,
        "status": status,
        "max_amount": 1000,
        "token": "t",
        "app_id": "app",
    })
}

/// Light client body for an existing account.
pub fn account_body(address_hex: &str, tx_count: u64) -> String {
    serde_json::json!({
        "code": 200,
        "message": "",
        "content": [{
            "name": "account",
            "detail": {
                "address": address_hex,
                "balance": 5000,
                "txCnt": tx_count,
                "isCreated": true,
                "isRoot": false,
            }
        }]
    })
    .to_string()
}

/// Light client body for a created transaction awaiting signature.
pub fn created_tx_body(hash_hex: &str) -> String {
    serde_json::json!({
        "code": 200,
        "message": "",
        "content": [{ "name": "TxHash", "detail": hash_hex }]
    })
    .to_string()
}

pub fn ok_body() -> String {
    serde_json::json!({ "code": 200, "message": "", "content": [] }).to_string()
}

pub fn status_ok() -> String {
    serde_json::json!({ "status": "OK", "response": null }).to_string()
}
