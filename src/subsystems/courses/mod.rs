//! Courses subsystem — owns the course generation pipeline and the chat
//! fallback.
//!
//! [`CoursesSubsystem`] implements [`BusHandler`] with prefix `"courses"`.
//! Method grammar:
//!
//! - `courses`           → decider: classify the message, then run the
//!   pipeline or answer as a plain assistant (chat channels hit this).
//! - `courses/generate`  → explicit pipeline run from a structured request
//!   (the HTTP form/API hits this).
//! - `courses/chat`      → plain assistant passthrough.
//! - `courses/health`    → current health snapshot.
//!
//! All LLM and search access goes through the capability surface on
//! [`CoursesState`]; the raw bus handle is private so pipeline code cannot
//! address arbitrary bus targets.

pub mod export;
pub mod pipeline;
pub mod prompt;
pub mod schema;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::CoursesConfig;
use crate::subsystems::tools::web_search::SearchHit;
use crate::supervisor::bus::{
    BusError, BusHandle, BusPayload, BusResult, ERR_INVALID_REQUEST, ERR_METHOD_NOT_FOUND,
};
use crate::supervisor::component_info::ComponentInfo;
use crate::supervisor::dispatch::BusHandler;
use crate::supervisor::health::HealthReporter;

use prompt::PromptBuilder;
use schema::GenerateRequest;

// ── CoursesState ────────────────────────────────────────────────────────────

/// Shared capability surface passed to pipeline steps.
///
/// The raw [`BusHandle`] is private — steps call typed methods and cannot
/// address arbitrary bus targets.
pub struct CoursesState {
    bus: BusHandle,
    /// Directory holding the prompt template files.
    pub prompts_dir: PathBuf,
    /// Language used when the request does not specify one.
    pub default_language: String,
    /// Cap on knowledge entries carried into the lesson prompt.
    pub max_knowledge: usize,
}

impl CoursesState {
    pub fn new(config: &CoursesConfig, bus: BusHandle) -> Self {
        Self {
            bus,
            prompts_dir: config.prompts_dir.clone(),
            default_language: config.default_language.clone(),
            max_knowledge: config.max_knowledge,
        }
    }

    /// Forward content to the LLM subsystem and return the completion text.
    pub async fn complete_via_llm(
        &self,
        channel_id: &str,
        content: &str,
        system: Option<&str>,
    ) -> Result<String, BusError> {
        let result = self
            .bus
            .request(
                "llm/complete",
                BusPayload::LlmRequest {
                    channel_id: channel_id.to_string(),
                    content: content.to_string(),
                    system: system.map(|s| s.to_string()),
                },
            )
            .await;
        match result {
            Err(e) => Err(BusError::internal(e.to_string())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(BusPayload::CommsMessage { content, .. })) => Ok(content),
            Ok(Ok(_)) => Err(BusError::internal("unexpected reply payload from llm")),
        }
    }

    /// Execute a web search through the tools subsystem.
    pub async fn web_search(
        &self,
        channel_id: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, BusError> {
        let args_json =
            serde_json::json!({ "query": query, "max_results": max_results }).to_string();
        let result = self
            .bus
            .request(
                "tools/execute",
                BusPayload::ToolRequest {
                    tool: "web_search".to_string(),
                    action: "search".to_string(),
                    args_json,
                    channel_id: channel_id.to_string(),
                },
            )
            .await;
        match result {
            Err(e) => Err(BusError::internal(e.to_string())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(BusPayload::ToolResponse { ok: true, data_json: Some(data), .. })) => {
                serde_json::from_str(&data)
                    .map_err(|e| BusError::internal(format!("bad tool response payload: {e}")))
            }
            Ok(Ok(BusPayload::ToolResponse { ok: false, error, .. })) => Err(BusError::internal(
                error.unwrap_or_else(|| "tool execution failed".to_string()),
            )),
            Ok(Ok(_)) => Err(BusError::internal("unexpected reply payload from tools")),
        }
    }
}

// ── Routing ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Route {
    Course,
    Chat,
}

/// Classify a free-form message: does the user want a course built, or a
/// plain chat answer?  Falls back to chat when the model's reply cannot be
/// parsed.
async fn decide_route(state: &Arc<CoursesState>, channel_id: &str, content: &str) -> Route {
    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("decider.md")
        .var("message", content)
        .build();

    match state.complete_via_llm(channel_id, &prompt, None).await {
        Ok(reply) => match schema::strip_reasoning(&reply).to_lowercase().as_str() {
            "course" => Route::Course,
            "chat" => Route::Chat,
            other => {
                warn!(reply = %other, "decider reply not recognised — defaulting to chat");
                Route::Chat
            }
        },
        Err(e) => {
            warn!(error = %e, "decider call failed — defaulting to chat");
            Route::Chat
        }
    }
}

/// Plain assistant passthrough with the chat system prompt.
async fn chat_reply(
    state: &Arc<CoursesState>,
    channel_id: &str,
    content: &str,
) -> Result<String, BusError> {
    let system = PromptBuilder::new(&state.prompts_dir).layer("chat.md").build();
    let system = if system.is_empty() { None } else { Some(system) };
    state
        .complete_via_llm(channel_id, content, system.as_deref())
        .await
}

// ── CoursesSubsystem ────────────────────────────────────────────────────────

pub struct CoursesSubsystem {
    state: Arc<CoursesState>,
    reporter: Option<HealthReporter>,
}

impl CoursesSubsystem {
    pub fn new(config: &CoursesConfig, bus: BusHandle) -> Self {
        Self {
            state: Arc::new(CoursesState::new(config, bus)),
            reporter: None,
        }
    }

    /// Attach a health reporter and report initial healthy state.
    pub fn with_health_reporter(mut self, reporter: HealthReporter) -> Self {
        let r = reporter.clone();
        tokio::spawn(async move { r.set_healthy().await });
        self.reporter = Some(reporter);
        self
    }
}

impl BusHandler for CoursesSubsystem {
    fn prefix(&self) -> &str {
        "courses"
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        if method == "courses/health" {
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                let h = match reporter {
                    Some(r) => r
                        .get_current()
                        .await
                        .unwrap_or_else(|| crate::supervisor::health::SubsystemHealth::ok("courses")),
                    None => crate::supervisor::health::SubsystemHealth::ok("courses"),
                };
                let data = serde_json::to_string(&h).unwrap_or_default();
                let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data }));
            });
            return;
        }

        match (method, payload) {
            // Explicit pipeline run from the HTTP form / JSON API.
            ("courses/generate", BusPayload::CourseRequest { channel_id, request_json }) => {
                let state = self.state.clone();
                debug!(%channel_id, "course generation requested");
                tokio::spawn(async move {
                    let req: GenerateRequest = match serde_json::from_str(&request_json) {
                        Ok(r) => r,
                        Err(e) => {
                            let _ = reply_tx.send(Err(BusError::new(
                                ERR_INVALID_REQUEST,
                                format!("invalid generate request: {e}"),
                            )));
                            return;
                        }
                    };
                    let result = pipeline::generate(&state, &channel_id, req).await.and_then(|course| {
                        serde_json::to_string(&course)
                            .map(|data| BusPayload::JsonResponse { data })
                            .map_err(|e| BusError::internal(format!("course serialization failed: {e}")))
                    });
                    let _ = reply_tx.send(result);
                });
            }

            // Plain assistant passthrough.
            ("courses/chat", BusPayload::CommsMessage { channel_id, content, .. }) => {
                let state = self.state.clone();
                tokio::spawn(async move {
                    let result = chat_reply(&state, &channel_id, &content).await.map(|reply| {
                        BusPayload::CommsMessage {
                            channel_id,
                            content: reply,
                            usage: None,
                        }
                    });
                    let _ = reply_tx.send(result);
                });
            }

            // Default route: decide between pipeline and chat.
            ("courses", BusPayload::CommsMessage { channel_id, content, .. }) => {
                let state = self.state.clone();
                tokio::spawn(async move {
                    let result = match decide_route(&state, &channel_id, &content).await {
                        Route::Course => pipeline::generate_from_text(&state, &channel_id, &content)
                            .await
                            .map(|course| course.markdown),
                        Route::Chat => chat_reply(&state, &channel_id, &content).await,
                    };
                    let result = result.map(|reply| BusPayload::CommsMessage {
                        channel_id,
                        content: reply,
                        usage: None,
                    });
                    let _ = reply_tx.send(result);
                });
            }

            (method, _) => {
                let _ = reply_tx.send(Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("courses method not found: {method}"),
                )));
            }
        }
    }

    fn component_info(&self) -> ComponentInfo {
        ComponentInfo::running(
            "courses",
            "Courses",
            vec![
                ComponentInfo::leaf("analyze", "Analyze"),
                ComponentInfo::leaf("objective", "Objective"),
                ComponentInfo::leaf("knowledge", "Knowledge"),
                ComponentInfo::leaf("lesson", "Lesson"),
                ComponentInfo::leaf("summary", "Summary"),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::bus::SupervisorBus;

    #[tokio::test]
    async fn unknown_method_rejected() {
        let bus = SupervisorBus::new(2);
        let cfg = crate::config::Config::test_default(std::path::Path::new("/tmp"));
        let courses = CoursesSubsystem::new(&cfg.courses, bus.handle.clone());

        let (reply_tx, reply_rx) = oneshot::channel();
        courses.handle_request("courses/rebuild", BusPayload::Empty, reply_tx);
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_rejects_malformed_request_json() {
        let bus = SupervisorBus::new(2);
        let cfg = crate::config::Config::test_default(std::path::Path::new("/tmp"));
        let courses = CoursesSubsystem::new(&cfg.courses, bus.handle.clone());

        let (reply_tx, reply_rx) = oneshot::channel();
        courses.handle_request(
            "courses/generate",
            BusPayload::CourseRequest {
                channel_id: "t0".into(),
                request_json: "{not json".into(),
            },
            reply_tx,
        );
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_INVALID_REQUEST);
    }

    #[test]
    fn component_info_lists_pipeline_steps() {
        let bus = SupervisorBus::new(2);
        let cfg = crate::config::Config::test_default(std::path::Path::new("/tmp"));
        let courses = CoursesSubsystem::new(&cfg.courses, bus.handle.clone());
        let info = courses.component_info();
        let ids: Vec<_> = info.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["analyze", "objective", "knowledge", "lesson", "summary"]);
    }
}
