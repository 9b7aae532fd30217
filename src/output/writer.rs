//! Result writer task
//!
//! Persistence runs on its own task and is reached only through messages: the
//! caller sends `persist` requests and receives one acknowledgement per request
//! on a separate channel. The wire shapes are
//!
//! ```text
//! request: {"operation": "persist", "key": <file name>, "payload": <json>}
//! ack:     {"status": "ok", "key": <file name>, "size": <records>}
//!          {"status": "error", "key": <file name>, "message": <text>}
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while persisting one payload
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid output key '{0}'")]
    InvalidKey(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum WriterRequest {
    Persist {
        key: String,
        payload: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriterAck {
    Ok { key: String, size: usize },
    Error { key: String, message: String },
}

impl WriterAck {
    pub fn key(&self) -> &str {
        match self {
            WriterAck::Ok { key, .. } | WriterAck::Error { key, .. } => key,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, WriterAck::Ok { .. })
    }
}

/// Handle to a running writer task
pub struct ResultWriter {
    requests: mpsc::Sender<WriterRequest>,
    task: JoinHandle<()>,
}

impl ResultWriter {
    /// Starts a writer that stores payloads under `directory`
    pub fn spawn(directory: PathBuf) -> (Self, mpsc::UnboundedReceiver<WriterAck>) {
        let (requests, inbox) = mpsc::channel(16);
        let (acks, ack_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve(directory, inbox, acks));
        (Self { requests, task }, ack_rx)
    }

    /// Queues a request; fails only if the writer task has stopped
    pub async fn submit(&self, request: WriterRequest) -> Result<(), crate::RippleError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| crate::RippleError::Writer("writer task has stopped".to_string()))
    }

    /// Closes the request channel and waits for queued requests to finish
    pub async fn finish(self) {
        drop(self.requests);
        if let Err(e) = self.task.await {
            tracing::error!("Result writer task failed: {}", e);
        }
    }
}

async fn serve(
    directory: PathBuf,
    mut inbox: mpsc::Receiver<WriterRequest>,
    acks: mpsc::UnboundedSender<WriterAck>,
) {
    while let Some(request) = inbox.recv().await {
        let WriterRequest::Persist { key, payload } = request;
        let ack = match persist(&directory, &key, &payload).await {
            Ok(size) => WriterAck::Ok { key, size },
            Err(e) => WriterAck::Error {
                key,
                message: e.to_string(),
            },
        };
        if acks.send(ack).is_err() {
            tracing::debug!("Acknowledgement receiver dropped");
        }
    }
}

async fn persist(
    directory: &Path,
    key: &str,
    payload: &serde_json::Value,
) -> Result<usize, OutputError> {
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(OutputError::InvalidKey(key.to_string())),
    }

    tokio::fs::create_dir_all(directory).await?;
    let text = serde_json::to_string_pretty(payload)?;
    tokio::fs::write(directory.join(key), text).await?;

    Ok(payload_size(payload))
}

/// Number of records in a payload
fn payload_size(payload: &serde_json::Value) -> usize {
    match payload {
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::Object(map) => map.len(),
        serde_json::Value::Null => 0,
        _ => 1,
    }
}
