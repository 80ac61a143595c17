//! Supervisor event bus — typed request/reply channel between subsystems.
//!
//! Every message names a target with a `"prefix/..."` method string and
//! carries a [`BusPayload`]. Requests travel with a `oneshot` reply slot;
//! notifications are fire-and-forget.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::llm::LlmUsage;

// ── Errors ──────────────────────────────────────────────────────────────────

pub const ERR_INVALID_REQUEST: i32 = -32600;
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
pub const ERR_INTERNAL: i32 = -32000;

/// Structured error returned by a subsystem over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusError {
    pub code: i32,
    pub message: String,
}

impl BusError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an internal (`-32000`) error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ERR_INTERNAL, message)
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus error {}: {}", self.code, self.message)
    }
}

impl Error for BusError {}

// ── Payloads ────────────────────────────────────────────────────────────────

/// Typed payloads carried by bus messages.
///
/// Request and response variants share this enum so handlers reply with the
/// same type they receive — the supervisor never inspects payload contents.
#[derive(Debug, Clone)]
pub enum BusPayload {
    /// No payload (queries like `manage/tree`).
    Empty,
    /// A chat-style message from a comms channel — also the reply shape.
    CommsMessage {
        channel_id: String,
        content: String,
        usage: Option<LlmUsage>,
    },
    /// Prompt completion request for the LLM subsystem.
    LlmRequest {
        channel_id: String,
        content: String,
        system: Option<String>,
    },
    /// Course generation request for the courses subsystem.
    /// `request_json` is a serialized `GenerateRequest`.
    CourseRequest {
        channel_id: String,
        request_json: String,
    },
    /// Tool execution request for the tools subsystem.
    ToolRequest {
        tool: String,
        action: String,
        args_json: String,
        channel_id: String,
    },
    /// Tool execution outcome. Tool-level failures are carried in-band
    /// (`ok = false`) so callers can distinguish them from bus failures.
    ToolResponse {
        tool: String,
        action: String,
        ok: bool,
        data_json: Option<String>,
        error: Option<String>,
    },
    /// Pre-serialized JSON response body.
    JsonResponse { data: String },
}

pub type BusResult = Result<BusPayload, BusError>;

// ── Messages ────────────────────────────────────────────────────────────────

/// A message delivered to the supervisor loop.
#[derive(Debug)]
pub enum BusMessage {
    Request {
        id: Uuid,
        method: String,
        payload: BusPayload,
        reply_tx: oneshot::Sender<BusResult>,
    },
    Notification {
        method: String,
        payload: BusPayload,
    },
}

// ── Handle ──────────────────────────────────────────────────────────────────

/// Call-level transport errors — the bus itself failed, not the handler.
#[derive(Debug)]
pub enum BusCallError {
    Send,
    Recv,
}

impl fmt::Display for BusCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusCallError::Send => write!(f, "bus send failed: supervisor is not running"),
            BusCallError::Recv => write!(f, "bus recv failed: handler dropped reply sender"),
        }
    }
}

impl Error for BusCallError {}

/// Cloneable sender half given to subsystems and comms channels.
#[derive(Clone)]
pub struct BusHandle {
    tx: mpsc::Sender<BusMessage>,
}

impl BusHandle {
    pub fn new(tx: mpsc::Sender<BusMessage>) -> Self {
        Self { tx }
    }

    /// Send a request and await the handler's reply.
    ///
    /// The outer `Result` is transport-level; the inner [`BusResult`] is the
    /// handler's own success or error.
    pub async fn request(
        &self,
        method: impl Into<String>,
        payload: BusPayload,
    ) -> Result<BusResult, BusCallError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = BusMessage::Request {
            id: Uuid::new_v4(),
            method: method.into(),
            payload,
            reply_tx,
        };
        self.tx.send(msg).await.map_err(|_| BusCallError::Send)?;
        reply_rx.await.map_err(|_| BusCallError::Recv)
    }

    /// Fire-and-forget notification. Dropped silently if the queue is full.
    pub fn notify(&self, method: impl Into<String>, payload: BusPayload) {
        let _ = self.tx.try_send(BusMessage::Notification {
            method: method.into(),
            payload,
        });
    }
}

/// Owns the supervisor-side receiver plus a cloneable [`BusHandle`].
pub struct SupervisorBus {
    pub rx: mpsc::Receiver<BusMessage>,
    pub handle: BusHandle,
}

impl SupervisorBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            rx,
            handle: BusHandle::new(tx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_error_display() {
        let e = BusError::new(ERR_METHOD_NOT_FOUND, "method not found: x/y");
        assert!(e.to_string().contains("-32601"));
        assert!(e.to_string().contains("x/y"));
    }

    #[tokio::test]
    async fn request_fails_when_supervisor_gone() {
        let bus = SupervisorBus::new(1);
        let handle = bus.handle.clone();
        drop(bus); // receiver gone
        let result = handle.request("llm/complete", BusPayload::Empty).await;
        assert!(matches!(result, Err(BusCallError::Send)));
    }

    #[tokio::test]
    async fn request_roundtrip() {
        let mut bus = SupervisorBus::new(4);
        let handle = bus.handle.clone();

        tokio::spawn(async move {
            if let Some(BusMessage::Request { reply_tx, payload, .. }) = bus.rx.recv().await {
                // Echo the payload back.
                let _ = reply_tx.send(Ok(payload));
            }
        });

        let reply = handle
            .request(
                "courses",
                BusPayload::CommsMessage {
                    channel_id: "test0".into(),
                    content: "hello".into(),
                    usage: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        match reply {
            BusPayload::CommsMessage { content, .. } => assert_eq!(content, "hello"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
