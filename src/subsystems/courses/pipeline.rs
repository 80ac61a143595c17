//! The course generation pipeline — a fixed sequence of prompt-template
//! calls, strictly sequential: each step's output is the next step's input.
//!
//! ```text
//! analyze (optional) → objective → knowledge → lesson → summary → export
//! ```
//!
//! Objective/lesson/summary failures abort the run with a bus error.
//! Knowledge failures are demoted to in-band placeholder entries so a flaky
//! search API degrades the course instead of killing it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::supervisor::bus::{BusError, ERR_INVALID_REQUEST};

use super::CoursesState;
use super::export;
use super::prompt::PromptBuilder;
use super::schema::{
    Course, CourseBrief, GenerateRequest, Knowledge, Lesson, Objective, ObjectiveList, SearchQuery,
    knowledge_to_text, objectives_to_text, parse_llm_json, strip_reasoning,
};

/// Run the pipeline from an explicit request (UI form / JSON API path).
pub async fn generate(
    state: &Arc<CoursesState>,
    channel_id: &str,
    req: GenerateRequest,
) -> Result<Course, BusError> {
    if req.topic.trim().is_empty() {
        return Err(BusError::new(ERR_INVALID_REQUEST, "topic must not be empty"));
    }
    if req.audience.trim().is_empty() {
        return Err(BusError::new(ERR_INVALID_REQUEST, "audience must not be empty"));
    }
    let brief = CourseBrief::from_request(req, &state.default_language);
    assemble(state, channel_id, brief).await
}

/// Run the pipeline from a free-form chat message (decider path) — the
/// analyze step extracts the brief first.
pub async fn generate_from_text(
    state: &Arc<CoursesState>,
    channel_id: &str,
    text: &str,
) -> Result<Course, BusError> {
    let brief = analyze_step(state, channel_id, text).await?;
    assemble(state, channel_id, brief).await
}

async fn assemble(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: CourseBrief,
) -> Result<Course, BusError> {
    info!(topic = %brief.topic, audience = %brief.audience, "course pipeline started");

    let objectives = objective_step(state, channel_id, &brief).await?;
    info!(count = objectives.len(), "objectives generated");

    let knowledge = knowledge_step(state, channel_id, &brief, &objectives).await;
    info!(count = knowledge.len(), "knowledge gathered");

    let lesson = lesson_step(state, channel_id, &brief, &objectives, &knowledge).await?;
    info!(title = %lesson.title, "lesson generated");

    let summary = summary_step(state, channel_id, &brief, &objectives, &knowledge, &lesson).await?;

    let markdown = export::course_to_markdown(&brief, &objectives, &knowledge, &lesson, &summary);

    Ok(Course {
        brief,
        objectives,
        knowledge,
        lesson,
        summary,
        markdown,
        generated_at: chrono::Utc::now().to_rfc3339(),
    })
}

// ── Steps ───────────────────────────────────────────────────────────────────

/// Extract a [`CourseBrief`] from a free-form request.
async fn analyze_step(
    state: &Arc<CoursesState>,
    channel_id: &str,
    text: &str,
) -> Result<CourseBrief, BusError> {
    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("analyze.md")
        .var("request", text)
        .var("language", &state.default_language)
        .build();

    let reply = state.complete_via_llm(channel_id, &prompt, None).await?;
    let mut brief: CourseBrief = parse_llm_json(&reply)
        .map_err(|e| BusError::internal(format!("analyze step: could not parse brief: {e}")))?;

    if brief.topic.trim().is_empty() {
        return Err(BusError::internal("analyze step: model returned an empty topic"));
    }
    if brief.language.trim().is_empty() {
        brief.language = state.default_language.clone();
    }
    if brief.title.trim().is_empty() {
        brief.title = format!("Introduction to {}", brief.topic);
    }
    Ok(brief)
}

/// Generate 3–5 learning objectives from topic + audience.
async fn objective_step(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: &CourseBrief,
) -> Result<Vec<Objective>, BusError> {
    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("objective.md")
        .var("topic", &brief.topic)
        .var("title", &brief.title)
        .var("audience", &brief.audience)
        .var("language", &brief.language)
        .var("details", brief.details.as_deref().unwrap_or("None"))
        .build();

    let reply = state.complete_via_llm(channel_id, &prompt, None).await?;
    let list: ObjectiveList = parse_llm_json(&reply)
        .map_err(|e| BusError::internal(format!("objective step: could not parse objectives: {e}")))?;

    if list.objectives.is_empty() {
        return Err(BusError::internal("objective step: model returned an empty objective list"));
    }
    Ok(list.objectives)
}

/// Derive a search query, execute it, and format results into [`Knowledge`]
/// entries.  Never fails the pipeline — failures become placeholder entries.
async fn knowledge_step(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: &CourseBrief,
    objectives: &[Objective],
) -> Vec<Knowledge> {
    let query = match derive_search_query(state, channel_id, brief, objectives).await {
        Ok(q) => q,
        Err(e) => {
            warn!(error = %e, "search query generation failed");
            return vec![Knowledge::query_failed(e.message)];
        }
    };
    if query.is_empty() {
        warn!("model returned an empty search query");
        return vec![Knowledge::query_failed("model returned an empty search query")];
    }

    info!(%query, "executing web search");
    match state.web_search(channel_id, &query, state.max_knowledge).await {
        Ok(hits) if hits.is_empty() => vec![Knowledge::no_results(&query)],
        Ok(hits) => hits
            .into_iter()
            .map(|h| Knowledge {
                title: h.title,
                source: h.url,
                content: h.content,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "web search failed");
            vec![Knowledge::search_failed(&query, e.message)]
        }
    }
}

async fn derive_search_query(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: &CourseBrief,
    objectives: &[Objective],
) -> Result<String, BusError> {
    let goals = objectives
        .iter()
        .map(|o| o.goal.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("search_query.md")
        .var("topic", &brief.topic)
        .var("title", &brief.title)
        .var("audience", &brief.audience)
        .var("objectives", &goals)
        .var("details", brief.details.as_deref().unwrap_or("None"))
        .build();

    let reply = state.complete_via_llm(channel_id, &prompt, None).await?;
    let parsed: SearchQuery = parse_llm_json(&reply)
        .map_err(|e| BusError::internal(format!("could not parse search query: {e}")))?;
    Ok(parsed.search_query.trim().to_string())
}

/// Generate the lesson from objectives + gathered knowledge.
async fn lesson_step(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: &CourseBrief,
    objectives: &[Objective],
    knowledge: &[Knowledge],
) -> Result<Lesson, BusError> {
    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("lesson.md")
        .var("topic", &brief.topic)
        .var("title", &brief.title)
        .var("audience", &brief.audience)
        .var("language", &brief.language)
        .var("objectives", objectives_to_text(objectives))
        .var("knowledge", knowledge_to_text(knowledge))
        .build();

    let reply = state.complete_via_llm(channel_id, &prompt, None).await?;
    let lesson: Lesson = parse_llm_json(&reply)
        .map_err(|e| BusError::internal(format!("lesson step: could not parse lesson: {e}")))?;

    if lesson.title.trim().is_empty() || lesson.core_content.trim().is_empty() {
        return Err(BusError::internal("lesson step: model returned an incomplete lesson"));
    }
    Ok(lesson)
}

/// Produce the free-text course recap.
async fn summary_step(
    state: &Arc<CoursesState>,
    channel_id: &str,
    brief: &CourseBrief,
    objectives: &[Objective],
    knowledge: &[Knowledge],
    lesson: &Lesson,
) -> Result<String, BusError> {
    let sources = knowledge
        .iter()
        .map(|k| k.title.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let prompt = PromptBuilder::new(&state.prompts_dir)
        .layer("summary.md")
        .var("title", &brief.title)
        .var("language", &brief.language)
        .var("objectives", objectives_to_text(objectives))
        .var("lesson_title", &lesson.title)
        .var("lesson_description", &lesson.description)
        .var("lesson_content", &lesson.core_content)
        .var("sources", sources)
        .build();

    let reply = state.complete_via_llm(channel_id, &prompt, None).await?;
    let summary = strip_reasoning(&reply).to_string();
    if summary.is_empty() {
        return Err(BusError::internal("summary step: model returned an empty summary"));
    }
    Ok(summary)
}
