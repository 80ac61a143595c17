//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency;
//! adding a backend = new module + new variant + new `complete` arm.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Usage accounting ────────────────────────────────────────────────────────

/// Token pricing rates (USD per 1 million tokens) for the active model.
#[derive(Debug, Clone, Default)]
pub struct ModelRates {
    pub input_per_million_usd: f64,
    pub output_per_million_usd: f64,
}

/// Token usage reported by a provider for a single completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl LlmUsage {
    /// Estimated cost of this completion in USD.
    pub fn cost_usd(&self, rates: &ModelRates) -> f64 {
        (self.input_tokens as f64 * rates.input_per_million_usd
            + self.output_tokens as f64 * rates.output_per_million_usd)
            / 1_000_000.0
    }
}

/// A completed LLM round-trip: reply text plus optional usage data.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ───────────────────────────────────────────────────────────

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Gemini(providers::gemini::GeminiProvider),
}

impl LlmProvider {
    /// Send `content` as the user message (with an optional system prompt)
    /// and return the provider's reply.
    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content, system).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(content, system).await,
            LlmProvider::Gemini(p) => p.complete(content, system).await,
        }
    }

    /// Lightweight reachability probe against the provider endpoint.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.ping().await,
            LlmProvider::OpenAiCompatible(p) => p.ping().await,
            LlmProvider::Gemini(p) => p.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_cost_computed_per_million() {
        let usage = LlmUsage {
            input_tokens: 1_000_000,
            output_tokens: 500_000,
        };
        let rates = ModelRates {
            input_per_million_usd: 0.30,
            output_per_million_usd: 2.50,
        };
        let cost = usage.cost_usd(&rates);
        assert!((cost - 1.55).abs() < 1e-9);
    }
}
