//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs that subsystems consume.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

// ── Comms ───────────────────────────────────────────────────────────────────

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
}

/// Axum HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct AxumChannelConfig {
    /// Whether the axum channel is explicitly enabled.
    pub enabled: bool,
    /// Socket address to bind the axum listener to.
    pub bind: String,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub axum_channel: AxumChannelConfig,
}

// ── LLM ─────────────────────────────────────────────────────────────────────

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Token pricing rates (USD per 1 million tokens).
    pub input_per_million_usd: f64,
    pub output_per_million_usd: f64,
}

/// Google Gemini provider configuration.
/// Populated from `[llm.gemini]` in the TOML.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Generative Language API base URL (the model path is appended).
    pub api_base_url: String,
    /// Model name (e.g. `gemini-2.5-flash`).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Token pricing rates (USD per 1 million tokens).
    pub input_per_million_usd: f64,
    pub output_per_million_usd: f64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`, `"gemini"`).
    pub provider: String,
    /// Config for the OpenAI / OpenAI-compatible provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
    /// Config for the Gemini provider (`[llm.gemini]`).
    pub gemini: GeminiConfig,
}

// ── Search ──────────────────────────────────────────────────────────────────

/// Web-search tool configuration (`[search]`).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Which search backend is active (`"dummy"`, `"tavily"`).
    pub provider: String,
    /// Search API endpoint URL.
    pub api_base_url: String,
    /// Default maximum number of results per query.
    pub max_results: usize,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

// ── Courses ─────────────────────────────────────────────────────────────────

/// Course pipeline configuration (`[courses]`).
#[derive(Debug, Clone)]
pub struct CoursesConfig {
    /// Directory holding the prompt template files.
    pub prompts_dir: PathBuf,
    /// Language used when the request does not specify one.
    pub default_language: String,
    /// Cap on knowledge entries carried into the lesson prompt.
    pub max_knowledge: usize,
}

// ── Config (root) ───────────────────────────────────────────────────────────

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Working directory for runtime data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub courses: CoursesConfig,
    /// API key from `LLM_API_KEY` env var — never sourced from TOML.
    pub llm_api_key: Option<String>,
    /// API key from `SEARCH_API_KEY` env var — never sourced from TOML.
    pub search_api_key: Option<String>,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the axum channel should be loaded.
    pub fn comms_axum_should_load(&self) -> bool {
        self.comms.axum_channel.enabled
    }
}
