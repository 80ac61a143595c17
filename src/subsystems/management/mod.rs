//! Management subsystem — supervisor-facing management bus handler.
//!
//! Exposes on the supervisor bus:
//! - `manage/http/get` — aggregated health/status JSON (used by HTTP
//!   `GET /api/health`).
//! - `manage/tree` — component tree JSON (used by HTTP `GET /api/tree`);
//!   no private data.

use std::sync::{Arc, OnceLock};

use tokio::sync::oneshot;

use crate::supervisor::bus::{BusError, BusPayload, BusResult, ERR_METHOD_NOT_FOUND};
use crate::supervisor::component_info::ComponentInfo;
use crate::supervisor::control::{ControlCommand, ControlHandle, ControlResponse};
use crate::supervisor::dispatch::BusHandler;
use crate::supervisor::health::HealthRegistry;

/// Static info collected at startup and included in the health response.
#[derive(Debug, Clone)]
pub struct ManagementInfo {
    pub app_name: String,
    pub llm_provider: String,
    pub llm_model: String,
}

pub struct ManagementSubsystem {
    control: ControlHandle,
    registry: HealthRegistry,
    info: ManagementInfo,
    /// Populated by `comms::start()` once the channel list is known.
    comms_info: Arc<OnceLock<ComponentInfo>>,
}

impl ManagementSubsystem {
    pub fn new(
        control: ControlHandle,
        registry: HealthRegistry,
        info: ManagementInfo,
        comms_info: Arc<OnceLock<ComponentInfo>>,
    ) -> Self {
        Self {
            control,
            registry,
            info,
            comms_info,
        }
    }
}

impl BusHandler for ManagementSubsystem {
    fn prefix(&self) -> &str {
        "manage"
    }

    fn component_info(&self) -> ComponentInfo {
        // Management itself is a leaf — the comms tree is injected
        // separately when building the full tree.
        ComponentInfo::leaf("manage", "Management")
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        const HTTP_GET: &str = "manage/http/get";
        const TREE: &str = "manage/tree";

        if !matches!(method, HTTP_GET | TREE) {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            )));
            return;
        }

        if !matches!(payload, BusPayload::Empty) {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("unsupported payload for method: {method}"),
            )));
            return;
        }

        let control = self.control.clone();
        let registry = self.registry.clone();
        let info = self.info.clone();
        let comms_info = self.comms_info.clone();
        let is_tree = method == TREE;

        tokio::spawn(async move {
            if is_tree {
                // Ask the supervisor for the component tree (calls
                // component_info() on each handler), then inject the comms
                // node if available.
                let tree_json = match control.request(ControlCommand::ComponentTree).await {
                    Ok(Ok(ControlResponse::ComponentTree { mut tree_json })) => {
                        if let Some(comms) = comms_info.get() {
                            if let Ok(mut root) = serde_json::from_str::<serde_json::Value>(&tree_json) {
                                if let Some(children) =
                                    root.get_mut("children").and_then(|c| c.as_array_mut())
                                {
                                    if let Ok(comms_val) = serde_json::to_value(comms) {
                                        children.push(comms_val);
                                        children.sort_by(|a, b| {
                                            a.get("id")
                                                .and_then(|v| v.as_str())
                                                .cmp(&b.get("id").and_then(|v| v.as_str()))
                                        });
                                    }
                                }
                                tree_json = serde_json::to_string(&root)
                                    .unwrap_or_else(|_| "{}".to_string());
                            }
                        }
                        tree_json
                    }
                    other => {
                        let _ = reply_tx.send(Err(BusError::internal(format!(
                            "control tree request failed: {other:?}"
                        ))));
                        return;
                    }
                };
                let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data: tree_json }));
                return;
            }

            // manage/http/get — aggregated health body.
            let uptime_ms = match control.request(ControlCommand::Health).await {
                Ok(Ok(ControlResponse::Health { uptime_ms })) => uptime_ms,
                other => {
                    let _ = reply_tx.send(Err(BusError::internal(format!(
                        "control health request failed: {other:?}"
                    ))));
                    return;
                }
            };

            let subsystems = registry.snapshot().await;
            let healthy = registry.all_healthy().await;
            let body = serde_json::json!({
                "app": info.app_name,
                "status": if healthy { "ok" } else { "degraded" },
                "uptime_ms": uptime_ms,
                "llm": {
                    "provider": info.llm_provider,
                    "model": info.llm_model,
                },
                "subsystems": subsystems,
            });
            let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data: body.to_string() }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::control::SupervisorControl;

    fn subsystem(control: ControlHandle) -> ManagementSubsystem {
        ManagementSubsystem::new(
            control,
            HealthRegistry::new(),
            ManagementInfo {
                app_name: "test".into(),
                llm_provider: "dummy".into(),
                llm_model: "test-model".into(),
            },
            Arc::new(OnceLock::new()),
        )
    }

    #[tokio::test]
    async fn unknown_method_rejected() {
        let control = SupervisorControl::new(2);
        let manage = subsystem(control.handle.clone());
        let (reply_tx, reply_rx) = oneshot::channel();
        manage.handle_request("manage/restart", BusPayload::Empty, reply_tx);
        let err = reply_rx.await.unwrap().unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn http_get_reports_degraded_when_any_unhealthy() {
        let mut control = SupervisorControl::new(2);
        let control_handle = control.handle.clone();

        // Minimal control loop answering Health.
        tokio::spawn(async move {
            while let Some(msg) = control.rx.recv().await {
                if let crate::supervisor::control::ControlMessage::Request { command, reply_tx } = msg {
                    let resp = match command {
                        ControlCommand::Health => ControlResponse::Health { uptime_ms: 42 },
                        _ => ControlResponse::Ack { message: "n/a".into() },
                    };
                    let _ = reply_tx.send(Ok(resp));
                }
            }
        });

        let registry = HealthRegistry::new();
        registry.reporter("llm").set_unhealthy_with("provider unreachable", None).await;

        let manage = ManagementSubsystem::new(
            control_handle,
            registry,
            ManagementInfo {
                app_name: "test".into(),
                llm_provider: "dummy".into(),
                llm_model: "test-model".into(),
            },
            Arc::new(OnceLock::new()),
        );

        let (reply_tx, reply_rx) = oneshot::channel();
        manage.handle_request("manage/http/get", BusPayload::Empty, reply_tx);
        let reply = reply_rx.await.unwrap().unwrap();
        match reply {
            BusPayload::JsonResponse { data } => {
                let body: serde_json::Value = serde_json::from_str(&data).unwrap();
                assert_eq!(body["status"], "degraded");
                assert_eq!(body["uptime_ms"], 42);
                assert_eq!(body["app"], "test");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
