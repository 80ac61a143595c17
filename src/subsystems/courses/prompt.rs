//! Layered prompt builder for pipeline steps.
//!
//! Prompts are assembled from plain-text template fragments stored under
//! `config/prompts/`.  Each layer is appended in order; missing files are
//! silently skipped so layers can be optional.  Variable substitution uses
//! `{{key}}` syntax and is applied once at [`PromptBuilder::build`] time,
//! after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a layered prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer by loading `filename` from the prompts directory.
    /// Silently skips the layer when the file does not exist.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let trimmed = text.trim().to_string();
                if !trimmed.is_empty() {
                    self.parts.push(trimmed);
                }
            }
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found — skipped", path.display());
            }
        }
        self
    }

    /// Directly append a text fragment (e.g. an already-loaded template body).
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register a single `{{key}}` → `value` substitution pair.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers and apply variable substitution.
    ///
    /// Unknown `{{placeholders}}` are left in place so a missing variable is
    /// visible in traces rather than silently vanishing.
    pub fn build(self) -> String {
        let mut text = self.parts.join(SEPARATOR);
        for (key, value) in &self.vars {
            text = text.replace(&format!("{{{{{key}}}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_prompt(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn layers_join_in_order_with_vars() {
        let dir = TempDir::new().unwrap();
        write_prompt(&dir, "a.md", "You teach {{topic}}.");
        write_prompt(&dir, "b.md", "Audience: {{audience}}");

        let prompt = PromptBuilder::new(dir.path())
            .layer("a.md")
            .layer("b.md")
            .var("topic", "Rust")
            .var("audience", "beginners")
            .build();

        assert_eq!(prompt, "You teach Rust.\n\nAudience: beginners");
    }

    #[test]
    fn missing_layer_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_prompt(&dir, "present.md", "hello");
        let prompt = PromptBuilder::new(dir.path())
            .layer("absent.md")
            .layer("present.md")
            .build();
        assert_eq!(prompt, "hello");
    }

    #[test]
    fn unknown_placeholder_left_in_place() {
        let dir = TempDir::new().unwrap();
        write_prompt(&dir, "a.md", "value: {{missing}}");
        let prompt = PromptBuilder::new(dir.path()).layer("a.md").build();
        assert_eq!(prompt, "value: {{missing}}");
    }

    #[test]
    fn append_trims_and_drops_empty() {
        let prompt = PromptBuilder::new("/nonexistent")
            .append("  body  ")
            .append("   ")
            .build();
        assert_eq!(prompt, "body");
    }
}
