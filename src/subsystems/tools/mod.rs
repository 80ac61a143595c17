//! Tools subsystem — executes side-effectful helpers on behalf of the
//! courses pipeline.
//!
//! Implements [`BusHandler`] with prefix `"tools"`.  The single route is
//! `tools/execute` with a [`BusPayload::ToolRequest`]; tool-level failures
//! are returned in-band (`ToolResponse { ok: false, .. }`) so callers can
//! distinguish them from bus failures.
//!
//! One tool today: `web_search` (action `search`).

pub mod web_search;

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::supervisor::bus::{BusError, BusPayload, BusResult, ERR_METHOD_NOT_FOUND};
use crate::supervisor::component_info::ComponentInfo;
use crate::supervisor::dispatch::BusHandler;
use crate::supervisor::health::HealthReporter;

use web_search::{SearchClient, SearchError};

/// Interval between background search endpoint reachability checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(120);

/// Arguments accepted by `web_search/search`, decoded from `args_json`.
#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

pub struct ToolsSubsystem {
    search: SearchClient,
    default_max_results: usize,
    reporter: Option<HealthReporter>,
}

impl ToolsSubsystem {
    /// Construct the subsystem. `api_key` comes from `SEARCH_API_KEY` env —
    /// never TOML.
    pub fn new(config: &SearchConfig, api_key: Option<String>) -> Result<Self, SearchError> {
        let search = SearchClient::build(config, api_key)?;
        Ok(Self {
            search,
            default_max_results: config.max_results,
            reporter: None,
        })
    }

    /// Attach a health reporter.  Call before registering with the supervisor.
    pub fn with_health_reporter(mut self, reporter: HealthReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Spawn a background task probing the search endpoint periodically.
    /// No-op if no reporter is set.
    pub fn spawn_health_checker(&self, shutdown: CancellationToken) {
        let reporter = match &self.reporter {
            Some(r) => r.clone(),
            None => return,
        };
        let search = self.search.clone();
        tokio::spawn(async move {
            Self::run_check(&search, &reporter).await;
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        Self::run_check(&search, &reporter).await;
                    }
                }
            }
        });
    }

    async fn run_check(search: &SearchClient, reporter: &HealthReporter) {
        match search.ping().await {
            Ok(()) => {
                debug!("search endpoint reachable");
                reporter.set_healthy().await;
            }
            Err(e) => {
                warn!(error = %e, "search endpoint unreachable");
                reporter
                    .set_unhealthy_with(format!("search endpoint unreachable: {e}"), None)
                    .await;
            }
        }
    }
}

impl BusHandler for ToolsSubsystem {
    fn prefix(&self) -> &str {
        "tools"
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        if method == "tools/health" {
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                let h = match reporter {
                    Some(r) => r
                        .get_current()
                        .await
                        .unwrap_or_else(|| crate::supervisor::health::SubsystemHealth::ok("tools")),
                    None => crate::supervisor::health::SubsystemHealth::ok("tools"),
                };
                let data = serde_json::to_string(&h).unwrap_or_default();
                let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data }));
            });
            return;
        }

        if method != "tools/execute" {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            )));
            return;
        }

        match payload {
            BusPayload::ToolRequest { tool, action, args_json, channel_id } => {
                if tool == "web_search" && action == "search" {
                    let search = self.search.clone();
                    let default_max = self.default_max_results;
                    debug!(%channel_id, "executing web_search");
                    tokio::spawn(async move {
                        let args = match serde_json::from_str::<WebSearchArgs>(&args_json) {
                            Ok(a) => a,
                            Err(e) => {
                                let _ = reply_tx.send(Ok(BusPayload::ToolResponse {
                                    tool,
                                    action,
                                    ok: false,
                                    data_json: None,
                                    error: Some(format!("invalid args: {e}")),
                                }));
                                return;
                            }
                        };
                        let max = args.max_results.unwrap_or(default_max).max(1);
                        match search.search(&args.query, max).await {
                            Ok(hits) => {
                                let data_json = serde_json::to_string(&hits)
                                    .unwrap_or_else(|_| "[]".to_string());
                                let _ = reply_tx.send(Ok(BusPayload::ToolResponse {
                                    tool,
                                    action,
                                    ok: true,
                                    data_json: Some(data_json),
                                    error: None,
                                }));
                            }
                            Err(e) => {
                                let _ = reply_tx.send(Ok(BusPayload::ToolResponse {
                                    tool,
                                    action,
                                    ok: false,
                                    data_json: None,
                                    error: Some(e.to_string()),
                                }));
                            }
                        }
                    });
                    return;
                }

                let _ = reply_tx.send(Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("tool/action not found: {tool}/{action}"),
                )));
            }
            _ => {
                let _ = reply_tx.send(Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("unsupported payload for method: {method}"),
                )));
            }
        }
    }

    fn component_info(&self) -> ComponentInfo {
        ComponentInfo::running(
            "tools",
            "Tools",
            vec![ComponentInfo::leaf("web_search", "Web search")],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn dummy_tools() -> ToolsSubsystem {
        let cfg = Config::test_default(std::path::Path::new("/tmp"));
        ToolsSubsystem::new(&cfg.search, None).unwrap()
    }

    #[tokio::test]
    async fn web_search_roundtrip() {
        let tools = dummy_tools();
        let (reply_tx, reply_rx) = oneshot::channel();
        tools.handle_request(
            "tools/execute",
            BusPayload::ToolRequest {
                tool: "web_search".into(),
                action: "search".into(),
                args_json: r#"{"query": "borrow checker"}"#.into(),
                channel_id: "t0".into(),
            },
            reply_tx,
        );
        let reply = reply_rx.await.unwrap().unwrap();
        match reply {
            BusPayload::ToolResponse { ok, data_json, .. } => {
                assert!(ok);
                let hits: Vec<web_search::SearchHit> =
                    serde_json::from_str(&data_json.unwrap()).unwrap();
                assert!(!hits.is_empty());
                assert!(hits[0].title.contains("borrow checker"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_args_are_in_band_failures() {
        let tools = dummy_tools();
        let (reply_tx, reply_rx) = oneshot::channel();
        tools.handle_request(
            "tools/execute",
            BusPayload::ToolRequest {
                tool: "web_search".into(),
                action: "search".into(),
                args_json: "not json".into(),
                channel_id: "t0".into(),
            },
            reply_tx,
        );
        let reply = reply_rx.await.unwrap().unwrap();
        match reply {
            BusPayload::ToolResponse { ok, error, .. } => {
                assert!(!ok);
                assert!(error.unwrap().contains("invalid args"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_rejected() {
        let tools = dummy_tools();
        let (reply_tx, reply_rx) = oneshot::channel();
        tools.handle_request(
            "tools/execute",
            BusPayload::ToolRequest {
                tool: "calculator".into(),
                action: "add".into(),
                args_json: "{}".into(),
                channel_id: "t0".into(),
            },
            reply_tx,
        );
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
    }
}
