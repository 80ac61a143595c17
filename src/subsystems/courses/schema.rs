//! Course records passed between pipeline steps, plus helpers for parsing
//! structured JSON out of raw LLM replies.
//!
//! Every record has a lifecycle scoped to a single request: created,
//! populated once, rendered, discarded.  Knowledge-step failures are
//! represented in-band as placeholder entries so they stay visible in the
//! rendered output instead of aborting the run.

use serde::{Deserialize, Serialize};

// ── Request types ───────────────────────────────────────────────────────────

/// A course generation request as submitted by the UI form / JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub audience: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Resolved course parameters — either taken directly from a
/// [`GenerateRequest`] or extracted from a free-form chat message by the
/// analyze step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseBrief {
    pub title: String,
    pub topic: String,
    pub audience: String,
    pub language: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl CourseBrief {
    /// Build a brief from an explicit request, filling the title from the
    /// topic when absent.
    pub fn from_request(req: GenerateRequest, default_language: &str) -> Self {
        let title = req
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Introduction to {}", req.topic));
        Self {
            title,
            topic: req.topic,
            audience: req.audience,
            language: req
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| default_language.to_string()),
            details: req.details.filter(|d| !d.trim().is_empty()),
        }
    }
}

// ── Generated records ───────────────────────────────────────────────────────

/// A single learning objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    /// The learning-goal string — starts with a measurable action verb.
    pub goal: String,
    /// Why the objective matters to the learner.
    pub description: String,
    /// What is in and out of bounds for this objective.
    pub scope: String,
}

/// Objective-step LLM reply shape.
#[derive(Debug, Deserialize)]
pub struct ObjectiveList {
    pub objectives: Vec<Objective>,
}

/// One grounding entry retrieved from web search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Knowledge {
    pub title: String,
    pub source: String,
    pub content: String,
}

impl Knowledge {
    /// Placeholder entry when the LLM failed to produce a usable query.
    pub fn query_failed(detail: impl Into<String>) -> Self {
        Self {
            title: "Query generation failed".into(),
            source: "internal".into(),
            content: detail.into(),
        }
    }

    /// Placeholder entry when search execution failed.
    pub fn search_failed(query: &str, detail: impl Into<String>) -> Self {
        Self {
            title: "Search execution failed".into(),
            source: "web_search".into(),
            content: format!("Failed to execute search for query '{query}': {}", detail.into()),
        }
    }

    /// Placeholder entry when the search returned nothing.
    pub fn no_results(query: &str) -> Self {
        Self {
            title: "No results found".into(),
            source: "web_search".into(),
            content: format!("No search results found for query: '{query}'."),
        }
    }
}

/// Search-query derivation reply shape.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search_query: String,
}

/// The generated lesson — all fields free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub introduction: String,
    pub benefits: String,
    pub core_content: String,
    pub conclusion: String,
    pub description: String,
    pub tips: String,
}

/// The fully-assembled course returned to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub brief: CourseBrief,
    pub objectives: Vec<Objective>,
    pub knowledge: Vec<Knowledge>,
    pub lesson: Lesson,
    pub summary: String,
    /// Rendered Markdown export of the whole course.
    #[serde(default)]
    pub markdown: String,
    /// RFC 3339 generation timestamp.
    #[serde(default)]
    pub generated_at: String,
}

// ── LLM output parsing ──────────────────────────────────────────────────────

/// Drop everything up to and including a trailing `</think>` tag.
///
/// Reasoning models prepend thought blocks despite instructions not to;
/// only the text after the last tag is the actual answer.
pub fn strip_reasoning(text: &str) -> &str {
    match text.rfind("</think>") {
        Some(idx) => text[idx + "</think>".len()..].trim(),
        None => text.trim(),
    }
}

/// Extract the JSON body from a raw LLM reply.
///
/// Models are instructed to reply with pure JSON but routinely wrap it in
/// Markdown code fences or surrounding prose. Takes the fenced block when
/// present, otherwise the outermost `{...}` span.
pub fn extract_json(text: &str) -> Option<&str> {
    let text = strip_reasoning(text);

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        let after = after.trim_start_matches(['\r', '\n']);
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].trim())
    } else {
        None
    }
}

/// Parse a `T` from a raw LLM reply, tolerating fences and prose around the
/// JSON body.
pub fn parse_llm_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, String> {
    let body = extract_json(text).ok_or_else(|| "no JSON object found in reply".to_string())?;
    serde_json::from_str(body).map_err(|e| e.to_string())
}

// ── Prompt formatting helpers ───────────────────────────────────────────────

/// Render objectives as a numbered plain-text block for prompt interpolation.
pub fn objectives_to_text(objectives: &[Objective]) -> String {
    if objectives.is_empty() {
        return "No learning objectives provided.".to_string();
    }
    let mut lines = Vec::new();
    for (i, obj) in objectives.iter().enumerate() {
        lines.push(format!("{}. Goal: {}", i + 1, obj.goal));
        lines.push(format!("   Description: {}", obj.description));
        lines.push(format!("   Scope: {}", obj.scope));
    }
    lines.join("\n")
}

/// Render knowledge entries as a titled plain-text block for prompt
/// interpolation.
pub fn knowledge_to_text(knowledge: &[Knowledge]) -> String {
    if knowledge.is_empty() {
        return "No grounding material was retrieved.".to_string();
    }
    knowledge
        .iter()
        .map(|k| format!("### {} ({})\n{}", k.title, k.source, k.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_from_request_fills_defaults() {
        let req = GenerateRequest {
            topic: "Rust ownership".into(),
            audience: "junior developers".into(),
            title: None,
            language: None,
            details: Some("  ".into()),
        };
        let brief = CourseBrief::from_request(req, "English");
        assert_eq!(brief.title, "Introduction to Rust ownership");
        assert_eq!(brief.language, "English");
        assert!(brief.details.is_none());
    }

    #[test]
    fn brief_from_request_keeps_explicit_fields() {
        let req = GenerateRequest {
            topic: "Sourdough".into(),
            audience: "home bakers".into(),
            title: Some("Bread from Scratch".into()),
            language: Some("German".into()),
            details: Some("focus on hydration".into()),
        };
        let brief = CourseBrief::from_request(req, "English");
        assert_eq!(brief.title, "Bread from Scratch");
        assert_eq!(brief.language, "German");
        assert_eq!(brief.details.as_deref(), Some("focus on hydration"));
    }

    #[test]
    fn strip_reasoning_takes_tail() {
        let text = "<think>long deliberation</think>\ncourse";
        assert_eq!(strip_reasoning(text), "course");
        assert_eq!(strip_reasoning("plain"), "plain");
    }

    #[test]
    fn extract_json_from_fenced_block() {
        let text = "Here you go:\n```json\n{\"search_query\": \"rust basics\"}\n```\nEnjoy!";
        let q: SearchQuery = parse_llm_json(text).unwrap();
        assert_eq!(q.search_query, "rust basics");
    }

    #[test]
    fn extract_json_from_bare_object_with_prose() {
        let text = "Sure — {\"objectives\": [{\"goal\": \"Implement X\", \"description\": \"d\", \"scope\": \"s\"}]} hope that helps";
        let list: ObjectiveList = parse_llm_json(text).unwrap();
        assert_eq!(list.objectives.len(), 1);
        assert_eq!(list.objectives[0].goal, "Implement X");
    }

    #[test]
    fn extract_json_handles_reasoning_prefix() {
        let text = "<think>hmm</think>{\"search_query\": \"q\"}";
        let q: SearchQuery = parse_llm_json(text).unwrap();
        assert_eq!(q.search_query, "q");
    }

    #[test]
    fn parse_llm_json_rejects_non_json() {
        let err = parse_llm_json::<SearchQuery>("no structure here").unwrap_err();
        assert!(err.contains("no JSON object"));
    }

    #[test]
    fn objectives_render_numbered() {
        let objectives = vec![Objective {
            goal: "Differentiate borrow kinds".into(),
            description: "Needed daily".into(),
            scope: "No unsafe".into(),
        }];
        let text = objectives_to_text(&objectives);
        assert!(text.starts_with("1. Goal: Differentiate"));
        assert!(text.contains("Scope: No unsafe"));
    }

    #[test]
    fn knowledge_placeholders_carry_context() {
        let k = Knowledge::search_failed("rust 101", "connection refused");
        assert!(k.content.contains("rust 101"));
        assert!(k.content.contains("connection refused"));
        let k = Knowledge::no_results("obscure query");
        assert!(k.content.contains("obscure query"));
    }
}
