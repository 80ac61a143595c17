//! End-to-end pipeline tests over the supervisor bus.
//!
//! A scripted LLM handler stands in for the real provider: it pops canned
//! replies in order, so each test fixes the exact model output and asserts
//! on the glue — routing, parsing, assembly, in-band error handling.  The
//! tools subsystem runs with its offline dummy search backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use coursesmith::config::{CoursesConfig, SearchConfig};
use coursesmith::subsystems::courses::CoursesSubsystem;
use coursesmith::subsystems::courses::schema::Course;
use coursesmith::subsystems::tools::ToolsSubsystem;
use coursesmith::supervisor;
use coursesmith::supervisor::bus::{
    BusError, BusHandle, BusPayload, BusResult, ERR_METHOD_NOT_FOUND, SupervisorBus,
};
use coursesmith::supervisor::control::SupervisorControl;
use coursesmith::supervisor::dispatch::BusHandler;

// ── Scripted LLM handler ────────────────────────────────────────────────────

/// Replies with pre-scripted texts, in order. Panics in the reply (as a bus
/// error) when the script runs dry so tests fail loudly.
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new<I: IntoIterator<Item = &'static str>>(replies: I) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

impl BusHandler for ScriptedLlm {
    fn prefix(&self) -> &str {
        "llm"
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        if method != "llm/complete" {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            )));
            return;
        }
        let channel_id = match payload {
            BusPayload::LlmRequest { channel_id, .. } => channel_id,
            _ => {
                let _ = reply_tx.send(Err(BusError::internal("expected LlmRequest")));
                return;
            }
        };
        let next = self.replies.lock().unwrap().pop_front();
        let result = match next {
            Some(content) => Ok(BusPayload::CommsMessage {
                channel_id,
                content,
                usage: None,
            }),
            None => Err(BusError::internal("scripted llm ran out of replies")),
        };
        let _ = reply_tx.send(result);
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

const OBJECTIVES_REPLY: &str = r#"{
  "objectives": [
    {"goal": "Implement ownership-correct APIs", "description": "Core daily skill.", "scope": "No unsafe code."},
    {"goal": "Diagnose borrow checker errors", "description": "Removes the biggest blocker.", "scope": "Compiler errors only."}
  ]
}"#;

const SEARCH_QUERY_REPLY: &str = r#"```json
{"search_query": "rust ownership borrowing tutorial"}
```"#;

const LESSON_REPLY: &str = r#"{
  "title": "Owning Your Data",
  "introduction": "This lesson introduces ownership.",
  "benefits": "You will stop fighting the borrow checker.",
  "core_content": "Every value has a single owner...",
  "conclusion": "Ownership is a compile-time contract.",
  "description": "A practical tour of move semantics and borrowing.",
  "tips": "Prefer borrowing over cloning."
}"#;

const SUMMARY_REPLY: &str =
    "This course takes you from mechanical borrow-checker fixes to deliberate ownership design.";

const BRIEF_REPLY: &str = r#"{
  "title": "Rust Ownership, Properly",
  "topic": "Rust ownership",
  "audience": "developers coming from Python",
  "language": "English",
  "details": null
}"#;

/// Spawn a supervisor with the given scripted LLM and return a bus handle
/// plus the shutdown token.
fn start_stack(llm: ScriptedLlm) -> (BusHandle, CancellationToken) {
    let search_cfg = SearchConfig {
        provider: "dummy".into(),
        api_base_url: "http://localhost:0/search".into(),
        max_results: 3,
        timeout_seconds: 1,
    };
    let courses_cfg = CoursesConfig {
        prompts_dir: std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts"),
        default_language: "English".into(),
        max_knowledge: 4,
    };

    let bus = SupervisorBus::new(32);
    let control = SupervisorControl::new(8);
    let handle = bus.handle.clone();
    let shutdown = CancellationToken::new();

    let tools = ToolsSubsystem::new(&search_cfg, None).unwrap();
    let courses = CoursesSubsystem::new(&courses_cfg, handle.clone());

    let handlers: Vec<Box<dyn BusHandler>> =
        vec![Box::new(llm), Box::new(tools), Box::new(courses)];

    tokio::spawn(supervisor::run(bus, control, shutdown.clone(), handlers));

    (handle, shutdown)
}

async fn generate(handle: &BusHandle, request_json: &str) -> BusResult {
    handle
        .request(
            "courses/generate",
            BusPayload::CourseRequest {
                channel_id: "test0".into(),
                request_json: request_json.into(),
            },
        )
        .await
        .expect("bus transport ok")
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn structured_request_populates_every_field() {
    let llm = ScriptedLlm::new([OBJECTIVES_REPLY, SEARCH_QUERY_REPLY, LESSON_REPLY, SUMMARY_REPLY]);
    let (handle, shutdown) = start_stack(llm);

    let reply = generate(
        &handle,
        r#"{"topic": "Rust ownership", "audience": "developers coming from Python"}"#,
    )
    .await
    .unwrap();

    let course: Course = match reply {
        BusPayload::JsonResponse { data } => serde_json::from_str(&data).unwrap(),
        other => panic!("unexpected payload: {other:?}"),
    };

    // Brief resolved from the request with defaults filled.
    assert_eq!(course.brief.topic, "Rust ownership");
    assert_eq!(course.brief.title, "Introduction to Rust ownership");
    assert_eq!(course.brief.language, "English");

    // Every generated field is non-empty after a successful run.
    assert_eq!(course.objectives.len(), 2);
    assert!(course.objectives[0].goal.starts_with("Implement"));
    assert!(!course.knowledge.is_empty());
    // Dummy search folds the derived query into its canned hits.
    assert!(course.knowledge[0].title.contains("rust ownership borrowing tutorial"));
    assert_eq!(course.lesson.title, "Owning Your Data");
    assert!(!course.lesson.core_content.is_empty());
    assert_eq!(course.summary, SUMMARY_REPLY);
    assert!(course.markdown.contains("# Introduction to Rust ownership"));
    assert!(course.markdown.contains("## Owning Your Data"));
    assert!(!course.generated_at.is_empty());

    shutdown.cancel();
}

#[tokio::test]
async fn decider_course_path_runs_analyze_first() {
    let llm = ScriptedLlm::new([
        "course", // decider
        BRIEF_REPLY,
        OBJECTIVES_REPLY,
        SEARCH_QUERY_REPLY,
        LESSON_REPLY,
        SUMMARY_REPLY,
    ]);
    let (handle, shutdown) = start_stack(llm);

    let reply = handle
        .request(
            "courses",
            BusPayload::CommsMessage {
                channel_id: "test0".into(),
                content: "please build me a course on rust ownership for python folks".into(),
                usage: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    match reply {
        BusPayload::CommsMessage { content, .. } => {
            // Chat channels get the rendered Markdown document.
            assert!(content.contains("# Rust Ownership, Properly"));
            assert!(content.contains("## Summary"));
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    shutdown.cancel();
}

#[tokio::test]
async fn decider_chat_path_answers_directly() {
    let llm = ScriptedLlm::new([
        "chat", // decider
        "Ownership means each value has exactly one owner.",
    ]);
    let (handle, shutdown) = start_stack(llm);

    let reply = handle
        .request(
            "courses",
            BusPayload::CommsMessage {
                channel_id: "test0".into(),
                content: "what is ownership in rust?".into(),
                usage: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    match reply {
        BusPayload::CommsMessage { content, .. } => {
            assert_eq!(content, "Ownership means each value has exactly one owner.");
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    shutdown.cancel();
}

#[tokio::test]
async fn garbled_decider_reply_falls_back_to_chat() {
    let llm = ScriptedLlm::new([
        "<think>maybe a course?</think>definitely-not-a-route",
        "Happy to help anyway.",
    ]);
    let (handle, shutdown) = start_stack(llm);

    let reply = handle
        .request(
            "courses",
            BusPayload::CommsMessage {
                channel_id: "test0".into(),
                content: "hmm".into(),
                usage: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    match reply {
        BusPayload::CommsMessage { content, .. } => assert_eq!(content, "Happy to help anyway."),
        other => panic!("unexpected payload: {other:?}"),
    }

    shutdown.cancel();
}

#[tokio::test]
async fn empty_search_query_becomes_placeholder_knowledge() {
    let llm = ScriptedLlm::new([
        OBJECTIVES_REPLY,
        r#"{"search_query": ""}"#,
        LESSON_REPLY,
        SUMMARY_REPLY,
    ]);
    let (handle, shutdown) = start_stack(llm);

    let reply = generate(&handle, r#"{"topic": "Knots", "audience": "sailors"}"#)
        .await
        .unwrap();

    let course: Course = match reply {
        BusPayload::JsonResponse { data } => serde_json::from_str(&data).unwrap(),
        other => panic!("unexpected payload: {other:?}"),
    };

    // The run still completes; the failure is visible in-band.
    assert_eq!(course.knowledge.len(), 1);
    assert_eq!(course.knowledge[0].title, "Query generation failed");
    assert!(!course.summary.is_empty());

    shutdown.cancel();
}

#[tokio::test]
async fn malformed_objectives_abort_the_run() {
    let llm = ScriptedLlm::new(["this is not json at all"]);
    let (handle, shutdown) = start_stack(llm);

    let err = generate(&handle, r#"{"topic": "Knots", "audience": "sailors"}"#)
        .await
        .unwrap_err();
    assert!(err.message.contains("objective"));

    shutdown.cancel();
}

#[tokio::test]
async fn empty_topic_rejected_before_any_llm_call() {
    let llm = ScriptedLlm::new([]);
    let (handle, shutdown) = start_stack(llm);

    let err = generate(&handle, r#"{"topic": "  ", "audience": "sailors"}"#)
        .await
        .unwrap_err();
    assert!(err.message.contains("topic"));

    shutdown.cancel();
}
