//! Tests for pipeline prompt templates under config/prompts.

use std::fs;
use std::path::Path;

fn prompts_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts")
}

fn prompt_path(name: &str) -> std::path::PathBuf {
    prompts_dir().join(name)
}

fn read(name: &str) -> String {
    fs::read_to_string(prompt_path(name))
        .unwrap_or_else(|e| panic!("prompt file '{name}' missing: {e}"))
}

#[test]
fn test_all_pipeline_prompts_exist() {
    for name in [
        "analyze.md",
        "decider.md",
        "objective.md",
        "search_query.md",
        "lesson.md",
        "summary.md",
        "chat.md",
    ] {
        assert!(prompt_path(name).exists(), "{name} prompt file missing");
    }
}

#[test]
fn test_analyze_template_vars() {
    let text = read("analyze.md");
    assert!(text.contains("{{request}}"), "analyze.md should contain {{request}}");
    assert!(text.contains("{{language}}"), "analyze.md should contain {{language}}");
}

#[test]
fn test_decider_template_vars() {
    let text = read("decider.md");
    assert!(text.contains("{{message}}"), "decider.md should contain {{message}}");
    // The router contract: exactly these two words.
    assert!(text.contains("`course`"));
    assert!(text.contains("`chat`"));
}

#[test]
fn test_objective_template_vars() {
    let text = read("objective.md");
    for var in ["{{topic}}", "{{title}}", "{{audience}}", "{{language}}", "{{details}}"] {
        assert!(text.contains(var), "objective.md should contain {var}");
    }
    assert!(text.contains("\"objectives\""), "objective.md should pin the JSON shape");
}

#[test]
fn test_search_query_template_vars() {
    let text = read("search_query.md");
    for var in ["{{topic}}", "{{title}}", "{{objectives}}", "{{audience}}"] {
        assert!(text.contains(var), "search_query.md should contain {var}");
    }
    assert!(text.contains("\"search_query\""));
}

#[test]
fn test_lesson_template_vars() {
    let text = read("lesson.md");
    for var in ["{{title}}", "{{topic}}", "{{audience}}", "{{language}}", "{{objectives}}", "{{knowledge}}"] {
        assert!(text.contains(var), "lesson.md should contain {var}");
    }
    // All seven lesson fields must be pinned in the schema block.
    for field in ["introduction", "benefits", "core_content", "conclusion", "description", "tips"] {
        assert!(text.contains(&format!("\"{field}\"")), "lesson.md should pin field {field}");
    }
}

#[test]
fn test_summary_template_vars() {
    let text = read("summary.md");
    for var in ["{{title}}", "{{language}}", "{{objectives}}", "{{lesson_title}}", "{{lesson_content}}", "{{sources}}"] {
        assert!(text.contains(var), "summary.md should contain {var}");
    }
}
