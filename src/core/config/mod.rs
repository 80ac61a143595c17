//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `COURSESMITH_WORK_DIR` and `COURSESMITH_LOG_LEVEL` env
//! overrides.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs consumed by subsystems
//!   (`Config`, `LlmConfig`, `SearchConfig`, etc.).
//! - **raw** — Raw TOML deserialization types (`RawConfig`, `RawLlm`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load** — Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

#[cfg(test)]
impl Config {
    /// Safe `Config` for unit tests — dummy LLM and search, no API keys,
    /// no external calls.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        Self {
            app_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            comms: CommsConfig {
                pty: PtyConfig { enabled: false },
                axum_channel: AxumChannelConfig {
                    enabled: false,
                    bind: "127.0.0.1:0".into(),
                },
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                    input_per_million_usd: 0.0,
                    output_per_million_usd: 0.0,
                },
                gemini: GeminiConfig {
                    api_base_url: "http://localhost:0/v1beta".into(),
                    model: "test-gemini".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                    input_per_million_usd: 0.0,
                    output_per_million_usd: 0.0,
                },
            },
            search: SearchConfig {
                provider: "dummy".into(),
                api_base_url: "http://localhost:0/search".into(),
                max_results: 3,
                timeout_seconds: 1,
            },
            courses: CoursesConfig {
                prompts_dir: std::path::PathBuf::from("config/prompts"),
                default_language: "English".into(),
                max_knowledge: 4,
            },
            llm_api_key: None,
            search_api_key: None,
        }
    }
}
