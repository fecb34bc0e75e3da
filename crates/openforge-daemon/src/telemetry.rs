use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("metrics server failed: {0}")]
    Server(std::io::Error),
}

#[derive(Debug, Default)]
struct TelemetryState {
    gate_tokens_issued_total: u64,
    gate_verify_total: HashMap<String, u64>,
    portfolio_commits_total: u64,
    portfolio_rejects_total: HashMap<String, u64>,
    invested_amount_total: u64,
}

/// Process-wide counters, rendered in Prometheus text exposition format.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_token_issued(&self) {
        let mut guard = self.state.lock();
        guard.gate_tokens_issued_total = guard.gate_tokens_issued_total.saturating_add(1);
    }

    pub fn record_gate_verify(&self, outcome: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .gate_verify_total
            .entry(outcome.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_commit(&self, amount: u64) {
        let mut guard = self.state.lock();
        guard.portfolio_commits_total = guard.portfolio_commits_total.saturating_add(1);
        guard.invested_amount_total = guard.invested_amount_total.saturating_add(amount);
    }

    pub fn record_commit_reject(&self, reason: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .portfolio_rejects_total
            .entry(reason.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn render(&self) -> String {
        let guard = self.state.lock();
        let mut out = String::new();
        out.push_str("# TYPE openforge_gate_tokens_issued_total counter\n");
        let _ = writeln!(
            out,
            "openforge_gate_tokens_issued_total {}",
            guard.gate_tokens_issued_total
        );
        out.push_str("# TYPE openforge_gate_verify_total counter\n");
        for (outcome, value) in &guard.gate_verify_total {
            let _ = writeln!(
                out,
                "openforge_gate_verify_total{{outcome=\"{}\"}} {}",
                outcome, value
            );
        }
        out.push_str("# TYPE openforge_portfolio_commits_total counter\n");
        let _ = writeln!(
            out,
            "openforge_portfolio_commits_total {}",
            guard.portfolio_commits_total
        );
        out.push_str("# TYPE openforge_portfolio_rejects_total counter\n");
        for (reason, value) in &guard.portfolio_rejects_total {
            let _ = writeln!(
                out,
                "openforge_portfolio_rejects_total{{reason=\"{}\"}} {}",
                reason, value
            );
        }
        out.push_str("# TYPE openforge_invested_amount_total counter\n");
        let _ = writeln!(
            out,
            "openforge_invested_amount_total {}",
            guard.invested_amount_total
        );
        out
    }

    pub async fn spawn_metrics_server(
        self: Arc<Self>,
        addr: SocketAddr,
    ) -> Result<tokio::task::JoinHandle<()>, TelemetryError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(TelemetryError::Server)?;
        Ok(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let telemetry = self.clone();
                        tokio::spawn(async move {
                            let mut buf = vec![0_u8; 2048];
                            match socket.read(&mut buf).await {
                                Ok(n) if n > 0 => {
                                    let req = String::from_utf8_lossy(&buf[..n]);
                                    let (status, body) = if req.starts_with("GET /metrics ") {
                                        ("200 OK", telemetry.render())
                                    } else {
                                        ("404 Not Found", "not found".to_string())
                                    };
                                    let response = format!(
                                        "HTTP/1.1 {status}\r\ncontent-type: text/plain; version=0.0.4\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                                        body.len(), body
                                    );
                                    let _ = socket.write_all(response.as_bytes()).await;
                                }
                                Ok(_) => {}
                                Err(err) => {
                                    tracing::warn!(error=%err, "metrics socket read failed");
                                }
                            }
                        });
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::error!(error=%err, "metrics server accept failed");
                        break;
                    }
                }
            }
        }))
    }
}
