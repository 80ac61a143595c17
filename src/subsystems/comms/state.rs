//! Shared state for the Comms subsystem — capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below.  The raw [`BusHandle`] is private; channels cannot call
//! arbitrary bus methods or supervisor internals.
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! subsystem manager (e.g. "I shut down") without going through the
//! supervisor bus.  The manager owns the receiver end.

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::AppError;
use crate::supervisor::bus::{BusHandle, BusPayload};

// ── Events ──────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
}

// ── State ───────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    /// Supervisor bus — private so channels can't call arbitrary methods.
    bus: BusHandle,
    /// Back-channel to the comms subsystem manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(bus: BusHandle, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { bus, event_tx }
    }

    /// Send a free-form message from `channel_id` to the courses subsystem
    /// and await the reply text.
    ///
    /// This is the primary outbound path for chat-style channels; the
    /// courses decider picks between pipeline and plain chat.
    pub async fn send_message(&self, channel_id: &str, content: String) -> Result<String, AppError> {
        let payload = BusPayload::CommsMessage {
            channel_id: channel_id.to_string(),
            content,
            usage: None,
        };

        match self.bus.request("courses", payload).await {
            Err(e) => Err(AppError::Comms(format!("bus error: {e}"))),
            Ok(Err(e)) => Err(AppError::Courses(format!("{} (code {})", e.message, e.code))),
            Ok(Ok(BusPayload::CommsMessage { content: reply, .. })) => Ok(reply),
            Ok(Ok(_)) => Err(AppError::Comms("unexpected reply payload".to_string())),
        }
    }

    /// Run the course pipeline from a structured request and return the
    /// course JSON.
    pub async fn generate_course(
        &self,
        channel_id: &str,
        request_json: String,
    ) -> Result<String, AppError> {
        let payload = BusPayload::CourseRequest {
            channel_id: channel_id.to_string(),
            request_json,
        };

        match self.bus.request("courses/generate", payload).await {
            Err(e) => Err(AppError::Comms(format!("bus error: {e}"))),
            Ok(Err(e)) => Err(AppError::Courses(format!("{} (code {})", e.message, e.code))),
            Ok(Ok(BusPayload::JsonResponse { data })) => Ok(data),
            Ok(Ok(_)) => Err(AppError::Comms("unexpected reply payload".to_string())),
        }
    }

    /// Request the aggregated health JSON via the management subsystem.
    pub async fn management_health(&self) -> Result<String, AppError> {
        match self.bus.request("manage/http/get", BusPayload::Empty).await {
            Err(e) => Err(AppError::Comms(format!("bus error: {e}"))),
            Ok(Err(e)) => Err(AppError::Comms(format!(
                "management error {}: {}",
                e.code, e.message
            ))),
            Ok(Ok(BusPayload::JsonResponse { data })) => Ok(data),
            Ok(Ok(_)) => Err(AppError::Comms("unexpected management reply payload".to_string())),
        }
    }

    /// Request the component tree (JSON) via the management bus route
    /// `manage/tree`.
    pub async fn management_tree(&self) -> Result<String, AppError> {
        match self.bus.request("manage/tree", BusPayload::Empty).await {
            Err(e) => Err(AppError::Comms(format!("bus error: {e}"))),
            Ok(Err(e)) => Err(AppError::Comms(format!(
                "management error {}: {}",
                e.code, e.message
            ))),
            Ok(Ok(BusPayload::JsonResponse { data })) => Ok(data),
            Ok(Ok(_)) => Err(AppError::Comms("unexpected management reply payload".to_string())),
        }
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is
    /// not keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
