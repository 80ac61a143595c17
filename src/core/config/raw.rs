//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ───────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub supervisor: RawSupervisor,
    #[serde(default)]
    pub comms: RawComms,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub search: RawSearch,
    #[serde(default)]
    pub courses: RawCourses,
}

#[derive(Deserialize)]
pub(super) struct RawSupervisor {
    pub app_name: String,
    pub work_dir: String,
    pub log_level: String,
}

// ── Comms ───────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawComms {
    #[serde(default)]
    pub pty: RawPty,
    #[serde(default)]
    pub axum_channel: RawAxumChannel,
}

#[derive(Deserialize)]
pub(super) struct RawPty {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
pub(super) struct RawAxumChannel {
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

impl Default for RawAxumChannel {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_http_bind(),
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
    #[serde(default)]
    pub gemini: RawGeminiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
            gemini: RawGeminiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub input_per_million_usd: f64,
    #[serde(default)]
    pub output_per_million_usd: f64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
            input_per_million_usd: 0.0,
            output_per_million_usd: 0.0,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub input_per_million_usd: f64,
    #[serde(default)]
    pub output_per_million_usd: f64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
            input_per_million_usd: 0.0,
            output_per_million_usd: 0.0,
        }
    }
}

// ── Search ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawSearch {
    #[serde(rename = "default", default = "default_search_provider")]
    pub provider: String,
    #[serde(default = "default_search_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            api_base_url: default_search_api_base_url(),
            max_results: default_search_max_results(),
            timeout_seconds: default_search_timeout_seconds(),
        }
    }
}

// ── Courses ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawCourses {
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_max_knowledge")]
    pub max_knowledge: usize,
}

impl Default for RawCourses {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            default_language: default_language(),
            max_knowledge: default_max_knowledge(),
        }
    }
}

// ── Serde default helpers ───────────────────────────────────────────────────

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_false() -> bool {
    false
}

pub(super) fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

pub(super) fn default_llm_provider() -> String {
    "dummy".to_string()
}

pub(super) fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

pub(super) fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub(super) fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

pub(super) fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

pub(super) fn default_temperature() -> f32 {
    0.3
}

pub(super) fn default_llm_timeout_seconds() -> u64 {
    60
}

pub(super) fn default_search_provider() -> String {
    "dummy".to_string()
}

pub(super) fn default_search_api_base_url() -> String {
    "https://api.tavily.com/search".to_string()
}

pub(super) fn default_search_max_results() -> usize {
    10
}

pub(super) fn default_search_timeout_seconds() -> u64 {
    30
}

pub(super) fn default_prompts_dir() -> String {
    "config/prompts".to_string()
}

pub(super) fn default_language() -> String {
    "English".to_string()
}

pub(super) fn default_max_knowledge() -> usize {
    8
}
