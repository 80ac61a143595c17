//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `COURSESMITH_WORK_DIR` and `COURSESMITH_LOG_LEVEL` env
//! overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::{self, RawConfig};
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. If no path is given and `config/default.toml` does not
/// exist, returns a hardcoded minimal default.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("COURSESMITH_WORK_DIR").ok();
    let log_level_override = env::var("COURSESMITH_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(
            Path::new(path),
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        );
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(
            default_path,
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        )
    } else {
        // Hardcoded minimal default
        let work_dir_str = work_dir_override.unwrap_or_else(|| "~/.coursesmith".to_string());
        let work_dir = expand_home(&work_dir_str);
        let log_level = log_level_override.unwrap_or_else(|| "info".to_string());

        Ok(Config {
            app_name: "coursesmith".to_string(),
            work_dir,
            log_level,
            comms: CommsConfig {
                pty: PtyConfig { enabled: true },
                axum_channel: AxumChannelConfig {
                    enabled: false,
                    bind: raw::default_http_bind(),
                },
            },
            llm: LlmConfig {
                provider: raw::default_llm_provider(),
                openai: OpenAiConfig {
                    api_base_url: raw::default_openai_api_base_url(),
                    model: raw::default_openai_model(),
                    temperature: raw::default_temperature(),
                    timeout_seconds: raw::default_llm_timeout_seconds(),
                    input_per_million_usd: 0.0,
                    output_per_million_usd: 0.0,
                },
                gemini: GeminiConfig {
                    api_base_url: raw::default_gemini_api_base_url(),
                    model: raw::default_gemini_model(),
                    temperature: raw::default_temperature(),
                    timeout_seconds: raw::default_llm_timeout_seconds(),
                    input_per_million_usd: 0.0,
                    output_per_million_usd: 0.0,
                },
            },
            search: SearchConfig {
                provider: raw::default_search_provider(),
                api_base_url: raw::default_search_api_base_url(),
                max_results: raw::default_search_max_results(),
                timeout_seconds: raw::default_search_timeout_seconds(),
            },
            courses: CoursesConfig {
                prompts_dir: PathBuf::from(raw::default_prompts_dir()),
                default_language: raw::default_language(),
                max_knowledge: raw::default_max_knowledge(),
            },
            llm_api_key: env::var("LLM_API_KEY").ok(),
            search_api_key: env::var("SEARCH_API_KEY").ok(),
        })
    }
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    let s = parsed.supervisor;

    let work_dir_str = work_dir_override.unwrap_or(&s.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();

    Ok(Config {
        app_name: s.app_name,
        work_dir,
        log_level,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
            axum_channel: AxumChannelConfig {
                enabled: parsed.comms.axum_channel.enabled,
                bind: parsed.comms.axum_channel.bind,
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
                input_per_million_usd: parsed.llm.openai.input_per_million_usd,
                output_per_million_usd: parsed.llm.openai.output_per_million_usd,
            },
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url,
                model: parsed.llm.gemini.model,
                temperature: parsed.llm.gemini.temperature,
                timeout_seconds: parsed.llm.gemini.timeout_seconds,
                input_per_million_usd: parsed.llm.gemini.input_per_million_usd,
                output_per_million_usd: parsed.llm.gemini.output_per_million_usd,
            },
        },
        search: SearchConfig {
            provider: parsed.search.provider,
            api_base_url: parsed.search.api_base_url,
            max_results: parsed.search.max_results.max(1),
            timeout_seconds: parsed.search.timeout_seconds,
        },
        courses: CoursesConfig {
            prompts_dir: PathBuf::from(parsed.courses.prompts_dir),
            default_language: parsed.courses.default_language,
            max_knowledge: parsed.courses.max_knowledge.max(1),
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
        search_api_key: env::var("SEARCH_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
