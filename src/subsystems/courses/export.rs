//! Markdown export of an assembled course.
//!
//! The UI offers the rendered document for download; the same text is
//! embedded in the course JSON so API consumers get it for free.

use super::schema::{CourseBrief, Knowledge, Lesson, Objective};

/// Render the full course document as Markdown.
pub fn course_to_markdown(
    brief: &CourseBrief,
    objectives: &[Objective],
    knowledge: &[Knowledge],
    lesson: &Lesson,
    summary: &str,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", brief.title));
    out.push_str(&format!(
        "*Topic: {} — for {} — in {}*\n\n",
        brief.topic, brief.audience, brief.language
    ));

    out.push_str("## Learning Objectives\n\n");
    if objectives.is_empty() {
        out.push_str("_No objectives were generated._\n\n");
    }
    for obj in objectives {
        out.push_str(&format!("- **{}**\n", obj.goal));
        out.push_str(&format!("  - {}\n", obj.description));
        out.push_str(&format!("  - Scope: {}\n", obj.scope));
    }
    if !objectives.is_empty() {
        out.push('\n');
    }

    out.push_str(&format!("## {}\n\n", lesson.title));
    push_section(&mut out, "Introduction", &lesson.introduction);
    push_section(&mut out, "Why it matters", &lesson.benefits);
    push_section(&mut out, "Core content", &lesson.core_content);
    push_section(&mut out, "Conclusion", &lesson.conclusion);
    push_section(&mut out, "Tips", &lesson.tips);

    out.push_str("## Summary\n\n");
    out.push_str(summary.trim());
    out.push_str("\n\n");

    if !knowledge.is_empty() {
        out.push_str("## Sources\n\n");
        for k in knowledge {
            out.push_str(&format!("- {} ({})\n", k.title, k.source));
        }
        out.push('\n');
    }

    out
}

fn push_section(out: &mut String, heading: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    out.push_str(&format!("### {heading}\n\n{body}\n\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (CourseBrief, Vec<Objective>, Vec<Knowledge>, Lesson) {
        (
            CourseBrief {
                title: "Bread from Scratch".into(),
                topic: "Sourdough".into(),
                audience: "home bakers".into(),
                language: "English".into(),
                details: None,
            },
            vec![Objective {
                goal: "Maintain a starter".into(),
                description: "The foundation of every loaf".into(),
                scope: "No commercial yeast".into(),
            }],
            vec![Knowledge {
                title: "Starter basics".into(),
                source: "https://example.org/starter".into(),
                content: "Flour and water.".into(),
            }],
            Lesson {
                title: "Your First Starter".into(),
                introduction: "intro".into(),
                benefits: "benefits".into(),
                core_content: "content".into(),
                conclusion: "conclusion".into(),
                description: "desc".into(),
                tips: "tips".into(),
            },
        )
    }

    #[test]
    fn renders_all_sections() {
        let (brief, objectives, knowledge, lesson) = sample();
        let md = course_to_markdown(&brief, &objectives, &knowledge, &lesson, "recap");
        assert!(md.starts_with("# Bread from Scratch\n"));
        assert!(md.contains("## Learning Objectives"));
        assert!(md.contains("**Maintain a starter**"));
        assert!(md.contains("## Your First Starter"));
        assert!(md.contains("### Core content"));
        assert!(md.contains("## Summary\n\nrecap"));
        assert!(md.contains("- Starter basics (https://example.org/starter)"));
    }

    #[test]
    fn empty_lesson_sections_are_omitted() {
        let (brief, objectives, knowledge, mut lesson) = sample();
        lesson.tips = "  ".into();
        let md = course_to_markdown(&brief, &objectives, &knowledge, &lesson, "recap");
        assert!(!md.contains("### Tips"));
    }
}
