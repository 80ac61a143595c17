//! Web-search client — Tavily-style REST search API.
//!
//! `SearchClient` mirrors the LLM provider pattern: an enum over backends,
//! constructed once at startup, cloned freely.  The `dummy` backend returns
//! deterministic canned hits so the pipeline can run offline and in tests.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::SearchConfig;

// ── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown search provider: {0}")]
    UnknownProvider(String),
    #[error("search API key missing (set SEARCH_API_KEY)")]
    MissingApiKey,
    #[error("search request failed: {0}")]
    Request(String),
}

// ── Result type ─────────────────────────────────────────────────────────────

/// One search hit, already flattened to the fields the pipeline consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

// ── Client enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SearchClient {
    Dummy,
    Tavily(TavilyClient),
}

impl SearchClient {
    /// Construct a client from config and an optional API key.
    pub fn build(config: &SearchConfig, api_key: Option<String>) -> Result<Self, SearchError> {
        match config.provider.as_str() {
            "dummy" => Ok(SearchClient::Dummy),
            "tavily" => Ok(SearchClient::Tavily(TavilyClient::new(
                config.api_base_url.clone(),
                config.timeout_seconds,
                api_key,
            )?)),
            other => Err(SearchError::UnknownProvider(other.to_string())),
        }
    }

    /// Execute `query` and return at most `max_results` hits.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        match self {
            SearchClient::Dummy => Ok(dummy_hits(query, max_results)),
            SearchClient::Tavily(c) => c.search(query, max_results).await,
        }
    }

    /// Reachability probe for the health checker.
    pub async fn ping(&self) -> Result<(), SearchError> {
        match self {
            SearchClient::Dummy => Ok(()),
            SearchClient::Tavily(c) => c.ping().await,
        }
    }
}

fn dummy_hits(query: &str, max_results: usize) -> Vec<SearchHit> {
    let hits = vec![
        SearchHit {
            title: format!("Overview: {query}"),
            url: "https://example.org/overview".to_string(),
            content: format!("Background reading covering {query} at an introductory level."),
            score: Some(0.9),
        },
        SearchHit {
            title: format!("Practical guide to {query}"),
            url: "https://example.org/guide".to_string(),
            content: format!("A step-by-step walkthrough of {query} with worked examples."),
            score: Some(0.7),
        },
    ];
    hits.into_iter().take(max_results).collect()
}

// ── Tavily ──────────────────────────────────────────────────────────────────

/// Client for the Tavily search REST API (`POST /search`).
///
/// Wire types are private to this module; callers only see [`SearchHit`].
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl TavilyClient {
    pub fn new(
        api_base_url: String,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SearchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base_url,
            api_key,
        })
    }

    pub async fn ping(&self) -> Result<(), SearchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| SearchError::Request(format!("failed to build ping client: {e}")))?;
        client
            .head(&self.api_base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| SearchError::Request(format!("unreachable: {e}")))
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let key = self.api_key.as_ref().ok_or(SearchError::MissingApiKey)?;

        let payload = TavilyRequest {
            query: query.to_string(),
            max_results,
        };

        debug!(query_len = query.len(), max_results, "sending search request");

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "search HTTP request failed (transport)");
                SearchError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%status, "search request returned HTTP error");
            return Err(SearchError::Request(format!("HTTP {status}: {body}")));
        }

        let parsed = response.json::<TavilyResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize search response");
            SearchError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(results = parsed.results.len(), "received search response");

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .enumerate()
            .map(|(i, r)| SearchHit {
                title: if r.title.trim().is_empty() {
                    format!("Search Result {}", i + 1)
                } else {
                    r.title
                },
                url: r.url,
                content: r.content,
                score: r.score,
            })
            .collect())
    }
}

// ── Private wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_returns_capped_hits() {
        let client = SearchClient::Dummy;
        let hits = client.search("rust ownership", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.contains("rust ownership"));
        assert!(!hits[0].url.is_empty());
    }

    #[tokio::test]
    async fn tavily_without_key_errors() {
        let c = TavilyClient::new("http://127.0.0.1:0/search".into(), 1, None).unwrap();
        let err = c.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, SearchError::MissingApiKey));
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut cfg = crate::config::Config::test_default(std::path::Path::new("/tmp")).search;
        cfg.provider = "bing".into();
        let err = SearchClient::build(&cfg, None).unwrap_err();
        assert!(err.to_string().contains("bing"));
    }

    #[test]
    fn result_parse_fills_missing_fields() {
        let body = r#"{"results": [{"url": "https://a.example", "content": "text"}]}"#;
        let parsed: TavilyResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.results[0].title.is_empty());
        assert!(parsed.results[0].score.is_none());
    }
}
