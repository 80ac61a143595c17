//! Axum-based HTTP channel — serves the chat-style UI form and the JSON API.
//!
//! Implements [`Component`] so it slots into the comms subsystem lifecycle:
//! `run()` drives the axum event loop; the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! GET  /api/tree            — component tree (no private data)
//! POST /api/message         — free-form chat (decider path)
//! POST /api/course          — structured course generation
//! POST /api/course/export   — render a course JSON body as Markdown
//! GET  /favicon.ico         → 204
//! GET  /                    → course form UI
//! ```

mod api;
mod ui;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::state::CommsState;

// ── Shared request state ────────────────────────────────────────────────────

/// Axum router state injected into every handler via
/// [`axum::extract::State`].  Cheap to clone — all fields are
/// reference-counted.
#[derive(Clone)]
pub(crate) struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    /// Comms subsystem capabilities (message routing, course generation).
    pub comms: Arc<CommsState>,
}

// ── AxumChannel ─────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<CommsState>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        state: Arc<CommsState>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            state,
        }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.state, shutdown))
    }
}

// ── Server loop ─────────────────────────────────────────────────────────────

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    comms: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let axum_state = AxumState {
        channel_id: Arc::from(channel_id.as_str()),
        comms,
    };

    let router = build_router(axum_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    Ok(())
}

// ── Router ──────────────────────────────────────────────────────────────────

fn build_router(state: AxumState) -> Router {
    Router::new()
        // API routes
        .route("/api/health", get(api::health))
        .route("/api/tree", get(api::tree))
        .route("/api/message", post(api::message))
        .route("/api/course", post(api::course))
        .route("/api/course/export", post(api::course_export))
        // UI routes
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .route("/", get(ui::root))
        .with_state(state)
}
