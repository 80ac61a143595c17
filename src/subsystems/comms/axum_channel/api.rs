//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`] and
//! returns an axum [`Response`].  Bus interactions go through the comms
//! capability surface; timeouts map to 504, subsystem errors to 502.

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::subsystems::courses::export::course_to_markdown;
use crate::subsystems::courses::schema::Course;

use super::AxumState;

/// Generation runs four to five sequential LLM round-trips plus a search
/// call, so the request timeout is much larger than for plain queries.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

// ── Request types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    match tokio::time::timeout(Duration::from_secs(3), state.comms.management_health()).await {
        Ok(Ok(body)) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "management health request failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => {
            warn!(channel_id = %state.channel_id, "management health request timed out");
            (StatusCode::GATEWAY_TIMEOUT, json_error("timeout", "health request timed out"))
                .into_response()
        }
    }
}

/// GET /api/tree — component tree (no private data).
pub(super) async fn tree(State(state): State<AxumState>) -> Response {
    match tokio::time::timeout(Duration::from_secs(3), state.comms.management_tree()).await {
        Ok(Ok(body)) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "management tree request failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => {
            warn!(channel_id = %state.channel_id, "management tree request timed out");
            (StatusCode::GATEWAY_TIMEOUT, json_error("timeout", "tree request timed out"))
                .into_response()
        }
    }
}

/// POST /api/message — free-form chat, routed through the decider.
pub(super) async fn message(
    State(state): State<AxumState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    match tokio::time::timeout(
        GENERATE_TIMEOUT,
        state.comms.send_message(&state.channel_id, req.message),
    )
    .await
    {
        Ok(Ok(reply)) => (StatusCode::OK, Json(json!({ "reply": reply }))).into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "message send failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            json_error("timeout", "LLM request timed out"),
        )
            .into_response(),
    }
}

/// POST /api/course — structured course generation.
///
/// The body is forwarded verbatim to the courses subsystem, which validates
/// it as a `GenerateRequest`.
pub(super) async fn course(
    State(state): State<AxumState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    match tokio::time::timeout(
        GENERATE_TIMEOUT,
        state.comms.generate_course(&state.channel_id, body.to_string()),
    )
    .await
    {
        Ok(Ok(course_json)) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            course_json,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "course generation failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            json_error("timeout", "course generation timed out"),
        )
            .into_response(),
    }
}

/// POST /api/course/export — render a previously generated course as
/// Markdown.  Pure formatting; no bus round-trip.
pub(super) async fn course_export(Json(course): Json<Course>) -> Response {
    let markdown = course_to_markdown(
        &course.brief,
        &course.objectives,
        &course.knowledge,
        &course.lesson,
        &course.summary,
    );
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    )
        .into_response()
}
