//! Dummy LLM provider — echoes input back prefixed with `[echo]`.
//! Used for testing the full bus round-trip without a real API key.

use crate::llm::{LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str, _system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: format!("[echo] {content}"),
            usage: None,
        })
    }

    pub async fn ping(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        assert_eq!(p.complete("hello", None).await.unwrap().text, "[echo] hello");
    }

    #[tokio::test]
    async fn system_prompt_ignored() {
        let p = DummyProvider;
        let r = p.complete("hi", Some("be terse")).await.unwrap();
        assert_eq!(r.text, "[echo] hi");
        assert!(r.usage.is_none());
    }
}
