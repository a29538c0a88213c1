//! Health & Status API endpoints
//!
//! Provides HTTP endpoints for monitoring and status:
//! - GET /health - Simple health check
//! - GET /metrics - Prometheus metrics
//! - GET /status - Session, pending transfer counts, uptime
//! - GET /pending - List tracked bridge transfers

use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::metrics;
use crate::session::SessionHandle;
use crate::tracker::ReconciliationTracker;

/// Status response
#[derive(Serialize)]
struct StatusResponse {
    status: String,
    uptime_seconds: u64,
    connected: bool,
    address: Option<String>,
    pending_transfers: usize,
    tracked_transfers: usize,
}

/// Pending transfers response
#[derive(Serialize)]
struct PendingResponse {
    transfers: Vec<TransferInfo>,
}

#[derive(Serialize)]
struct TransferInfo {
    tx_hash: String,
    amount: String,
    timestamp: u64,
    status: String,
    destination_recipient: String,
}

/// Start the API server (combines metrics and status endpoints)
pub async fn start_api_server(
    addr: SocketAddr,
    session: SessionHandle,
    tracker: Arc<Mutex<ReconciliationTracker>>,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server started");

    let start_time = Instant::now();
    metrics::UP.set(1.0);

    loop {
        let (mut socket, _) = listener.accept().await?;
        let session = session.clone();
        let tracker = tracker.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            if socket.readable().await.is_ok() {
                let _ = socket.try_read(&mut buf);
            }

            let request = String::from_utf8_lossy(&buf);

            if request.contains("GET /metrics") {
                // Prometheus metrics
                let encoder = TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut buffer = Vec::new();
                let _ = encoder.encode(&metric_families, &mut buffer);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n",
                    buffer.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&buffer).await;
            } else if request.contains("GET /health") {
                let response =
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
                let _ = socket.write_all(response.as_bytes()).await;
            } else if request.contains("GET /status") {
                let status = build_status_response(start_time, &session, &tracker).await;
                let body = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            } else if request.contains("GET /pending") {
                let pending = build_pending_response(&tracker).await;
                let body = serde_json::to_string(&pending).unwrap_or_else(|_| "{}".to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            } else {
                let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
    }
}

async fn build_status_response(
    start_time: Instant,
    session: &SessionHandle,
    tracker: &Arc<Mutex<ReconciliationTracker>>,
) -> StatusResponse {
    let current = session.current().await;
    let tracker = tracker.lock().await;

    StatusResponse {
        status: "ok".to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        connected: current.is_some(),
        address: current.map(|s| s.address),
        pending_transfers: tracker.pending_count(),
        tracked_transfers: tracker.transfers().len(),
    }
}

async fn build_pending_response(tracker: &Arc<Mutex<ReconciliationTracker>>) -> PendingResponse {
    let tracker = tracker.lock().await;
    let transfers = tracker
        .transfers()
        .iter()
        .map(|t| TransferInfo {
            tx_hash: t.tx_hash.clone(),
            amount: t.amount.clone(),
            timestamp: t.timestamp,
            status: t.status.as_str().to_string(),
            destination_recipient: t.destination_recipient.clone(),
        })
        .collect();

    PendingResponse { transfers }
}
