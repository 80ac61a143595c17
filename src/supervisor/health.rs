//! Health registry — push-based subsystem health state.
//!
//! Each subsystem holds a [`HealthReporter`] handle and writes its state
//! whenever it changes (startup, periodic check, error recovery).  The
//! [`HealthRegistry`] stores the last-written state per subsystem and
//! returns a snapshot on demand — no fan-out on read, no latency from
//! subsystem I/O.
//!
//! Subsystems with external dependencies (LLM provider, search endpoint)
//! spawn a background task that runs a lightweight check on a timer and
//! calls the reporter.  Others simply set healthy at startup and unhealthy
//! on errors.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

// ── SubsystemHealth ─────────────────────────────────────────────────────────

/// Health state snapshot for a single subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemHealth {
    /// Subsystem identifier (matches the handler prefix).
    pub id: String,
    /// `true` = healthy; `false` = unhealthy or degraded.
    pub healthy: bool,
    /// Human-readable status message.
    pub message: String,
    /// Optional structured extra fields (model name, endpoint, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl SubsystemHealth {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: true,
            message: "ok".into(),
            details: None,
        }
    }

    pub fn degraded(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: false,
            message: message.into(),
            details: None,
        }
    }
}

// ── HealthRegistry ──────────────────────────────────────────────────────────

/// Shared registry of per-subsystem health states.
///
/// Clone freely — it is backed by an `Arc` and is `Send + Sync`.
#[derive(Clone, Default)]
pub struct HealthRegistry {
    inner: Arc<RwLock<HashMap<String, SubsystemHealth>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reporter handle for a subsystem.
    ///
    /// The reporter writes into this registry under the given `id`.
    pub fn reporter(&self, id: impl Into<String>) -> HealthReporter {
        HealthReporter {
            id: id.into(),
            registry: self.clone(),
        }
    }

    /// Snapshot all current health states, sorted by id.
    pub async fn snapshot(&self) -> Vec<SubsystemHealth> {
        let map = self.inner.read().await;
        let mut v: Vec<_> = map.values().cloned().collect();
        v.sort_by(|a, b| a.id.cmp(&b.id));
        v
    }

    /// `true` if every registered subsystem is healthy, or none registered.
    pub async fn all_healthy(&self) -> bool {
        self.inner.read().await.values().all(|h| h.healthy)
    }
}

// ── HealthReporter ──────────────────────────────────────────────────────────

/// Per-subsystem write handle into a [`HealthRegistry`].
#[derive(Clone)]
pub struct HealthReporter {
    id: String,
    registry: HealthRegistry,
}

impl HealthReporter {
    pub async fn set_healthy(&self) {
        self.write(SubsystemHealth::ok(&self.id)).await;
    }

    pub async fn set_healthy_with(&self, message: impl Into<String>, details: Option<serde_json::Value>) {
        let mut h = SubsystemHealth::ok(&self.id);
        h.message = message.into();
        h.details = details;
        self.write(h).await;
    }

    pub async fn set_unhealthy_with(&self, message: impl Into<String>, details: Option<serde_json::Value>) {
        let mut h = SubsystemHealth::degraded(&self.id, message);
        h.details = details;
        self.write(h).await;
    }

    /// Read back the current state for this subsystem, if any was written.
    pub async fn get_current(&self) -> Option<SubsystemHealth> {
        self.registry.inner.read().await.get(&self.id).cloned()
    }

    async fn write(&self, h: SubsystemHealth) {
        self.registry.inner.write().await.insert(self.id.clone(), h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reporter_writes_into_registry() {
        let registry = HealthRegistry::new();
        let r = registry.reporter("llm");
        r.set_healthy().await;
        assert!(registry.all_healthy().await);

        r.set_unhealthy_with("provider unreachable", None).await;
        assert!(!registry.all_healthy().await);

        let snap = registry.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id, "llm");
        assert!(snap[0].message.contains("unreachable"));
    }

    #[tokio::test]
    async fn snapshot_sorted_by_id() {
        let registry = HealthRegistry::new();
        registry.reporter("tools").set_healthy().await;
        registry.reporter("courses").set_healthy().await;
        registry.reporter("llm").set_healthy().await;
        let ids: Vec<_> = registry.snapshot().await.into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["courses", "llm", "tools"]);
    }
}
