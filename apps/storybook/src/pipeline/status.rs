use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

/// Receives human-readable progress messages in execution order.
pub trait StatusSink: Send + Sync {
    fn report(&self, message: &str);
}

/// What the status endpoint returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStatus {
    pub is_generating: bool,
    pub status: String,
    pub logs: Vec<String>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Single writer, many readers. Every message is appended to `logs`, so a
/// poller that skips intermediate snapshots never loses a message.
#[derive(Clone)]
pub struct StatusChannel {
    tx: Arc<watch::Sender<GenerationStatus>>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GenerationStatus {
            status: "Ready".to_string(),
            ..GenerationStatus::default()
        });
        Self { tx: Arc::new(tx) }
    }

    /// Starts a fresh run: clears the log and marks generation active.
    pub fn begin(&self, run_id: Uuid) {
        info!(%run_id, "Run started");
        self.tx.send_modify(|s| {
            s.is_generating = true;
            s.status = "Starting...".to_string();
            s.logs.clear();
            s.run_id = Some(run_id);
            s.started_at = Some(Utc::now());
        });
    }

    /// Sets the terminal status and clears `is_generating`.
    pub fn finish(&self, status: &str) {
        info!(status, "Run finished");
        self.tx.send_modify(|s| {
            s.is_generating = false;
            s.status = status.to_string();
        });
    }

    pub fn snapshot(&self) -> GenerationStatus {
        self.tx.borrow().clone()
    }
}

impl StatusSink for StatusChannel {
    fn report(&self, message: &str) {
        info!("{message}");
        self.tx.send_modify(|s| {
            s.status = message.to_string();
            s.logs.push(message.to_string());
        });
    }
}
