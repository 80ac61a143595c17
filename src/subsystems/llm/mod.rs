//! LLM subsystem — routes `llm/*` bus requests to the configured provider.
//!
//! Implements [`BusHandler`] with prefix `"llm"` so the supervisor can
//! register it generically.  Each request is resolved in a spawned task;
//! the supervisor loop is never blocked on I/O.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::llm::providers;
use crate::llm::{LlmProvider, ModelRates, ProviderError};
use crate::supervisor::bus::{BusError, BusPayload, BusResult, ERR_METHOD_NOT_FOUND};
use crate::supervisor::component_info::ComponentInfo;
use crate::supervisor::dispatch::BusHandler;
use crate::supervisor::health::HealthReporter;

/// Interval between background provider reachability checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub struct LlmSubsystem {
    provider: LlmProvider,
    provider_name: String,
    model_name: String,
    rates: ModelRates,
    reporter: Option<HealthReporter>,
}

impl LlmSubsystem {
    /// Construct the subsystem. `api_key` comes from `LLM_API_KEY` env — never TOML.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let provider = providers::build(config, api_key)?;
        let provider_name = config.provider.clone();
        let (model_name, rates) = match config.provider.as_str() {
            "gemini" => (
                config.gemini.model.clone(),
                ModelRates {
                    input_per_million_usd: config.gemini.input_per_million_usd,
                    output_per_million_usd: config.gemini.output_per_million_usd,
                },
            ),
            _ => (
                config.openai.model.clone(),
                ModelRates {
                    input_per_million_usd: config.openai.input_per_million_usd,
                    output_per_million_usd: config.openai.output_per_million_usd,
                },
            ),
        };
        Ok(Self {
            provider,
            provider_name,
            model_name,
            rates,
            reporter: None,
        })
    }

    /// Attach a health reporter to this subsystem.
    ///
    /// Call before registering with the supervisor.  The reporter is used by
    /// both the background checker and the `llm/health` bus handler.
    pub fn with_health_reporter(mut self, reporter: HealthReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Spawn a background task that probes the LLM provider endpoint
    /// periodically.
    ///
    /// Uses the reporter set via [`Self::with_health_reporter`].
    /// The task stops when `shutdown` is cancelled.  No-op if no reporter is
    /// set.
    pub fn spawn_health_checker(&self, shutdown: CancellationToken) {
        let reporter = match &self.reporter {
            Some(r) => r.clone(),
            None => return,
        };
        let provider = self.provider.clone();
        let model = self.model_name.clone();
        tokio::spawn(async move {
            // Run an immediate check on startup.
            Self::run_check(&provider, &model, &reporter).await;
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            interval.tick().await; // consume the first (immediate) tick
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        Self::run_check(&provider, &model, &reporter).await;
                    }
                }
            }
        });
    }

    async fn run_check(provider: &LlmProvider, model: &str, reporter: &HealthReporter) {
        match provider.ping().await {
            Ok(()) => {
                debug!(model, "llm provider reachable");
                reporter
                    .set_healthy_with("ok", Some(serde_json::json!({ "model": model })))
                    .await;
            }
            Err(e) => {
                warn!(model, error = %e, "llm provider unreachable");
                reporter
                    .set_unhealthy_with(
                        format!("provider unreachable: {e}"),
                        Some(serde_json::json!({ "model": model })),
                    )
                    .await;
            }
        }
    }
}

impl BusHandler for LlmSubsystem {
    fn prefix(&self) -> &str {
        "llm"
    }

    /// Route an `llm/*` request. Ownership of `reply_tx` is moved into a
    /// spawned task — the supervisor loop returns immediately.
    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        // On-demand health check: runs a live ping and returns the updated state.
        if method == "llm/health" {
            let provider = self.provider.clone();
            let model = self.model_name.clone();
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                let h = match reporter {
                    Some(r) => {
                        Self::run_check(&provider, &model, &r).await;
                        r.get_current()
                            .await
                            .unwrap_or_else(|| crate::supervisor::health::SubsystemHealth::ok("llm"))
                    }
                    None => crate::supervisor::health::SubsystemHealth::ok("llm"),
                };
                let data = serde_json::to_string(&h).unwrap_or_default();
                let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data }));
            });
            return;
        }

        if method != "llm/complete" {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            )));
            return;
        }

        match payload {
            BusPayload::LlmRequest { channel_id, content, system } => {
                let provider = self.provider.clone();
                let rates = self.rates.clone();
                debug!(%method, %channel_id, "dispatching to llm provider");
                tokio::spawn(async move {
                    let result = provider
                        .complete(&content, system.as_deref())
                        .await
                        .map(|resp| {
                            if let Some(u) = &resp.usage {
                                debug!(
                                    input_tokens = u.input_tokens,
                                    output_tokens = u.output_tokens,
                                    cost_usd = u.cost_usd(&rates),
                                    "llm usage"
                                );
                            }
                            BusPayload::CommsMessage {
                                channel_id,
                                content: resp.text,
                                usage: resp.usage,
                            }
                        })
                        .map_err(|e| BusError::internal(e.to_string()));
                    let _ = reply_tx.send(result);
                });
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
        let provider_id = self.provider_name.as_str();
        let provider_label = format!(
            "{} ({})",
            ComponentInfo::capitalise(provider_id),
            self.model_name
        );
        ComponentInfo::running("llm", "LLM", vec![ComponentInfo::leaf(provider_id, &provider_label)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn dummy_subsystem() -> LlmSubsystem {
        let cfg = Config::test_default(std::path::Path::new("/tmp"));
        LlmSubsystem::new(&cfg.llm, None).unwrap()
    }

    #[tokio::test]
    async fn complete_roundtrip_with_dummy_provider() {
        let llm = dummy_subsystem();
        let (reply_tx, reply_rx) = oneshot::channel();
        llm.handle_request(
            "llm/complete",
            BusPayload::LlmRequest {
                channel_id: "t0".into(),
                content: "ping".into(),
                system: None,
            },
            reply_tx,
        );
        let reply = reply_rx.await.unwrap().unwrap();
        match reply {
            BusPayload::CommsMessage { content, .. } => assert_eq!(content, "[echo] ping"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_method_rejected() {
        let llm = dummy_subsystem();
        let (reply_tx, reply_rx) = oneshot::channel();
        llm.handle_request("llm/stream", BusPayload::Empty, reply_tx);
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
    }

    #[test]
    fn component_info_lists_provider_child() {
        let llm = dummy_subsystem();
        let info = llm.component_info();
        assert_eq!(info.id, "llm");
        assert_eq!(info.children.len(), 1);
        assert_eq!(info.children[0].id, "dummy");
    }
}
