//! Component info — shared type for describing the runtime component tree.
//!
//! Every [`BusHandler`] subsystem can override
//! [`BusHandler::component_info`] to expose its children. The supervisor
//! uses this to build the full tree for `ControlCommand::ComponentTree`.
//! Non-bus subsystems (comms) inject their info via an
//! `Arc<OnceLock<ComponentInfo>>` populated at startup.
//!
//! [`BusHandler`]: crate::supervisor::dispatch::BusHandler
//! [`BusHandler::component_info`]: crate::supervisor::dispatch::BusHandler::component_info

use serde::{Deserialize, Serialize};

/// Runtime state of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is loaded and operating normally.
    On,
    /// Component is loaded but intentionally inactive.
    Off,
    /// Component has encountered an error.
    Err,
}

/// Description of a single component node for the management tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Stable machine identifier (e.g. `"courses"`, `"pty0"`).
    pub id: String,
    /// Human-readable display name (e.g. `"Courses"`, `"PTY"`).
    pub name: String,
    /// Lifecycle status string (`"running"` or `"stopped"`).
    pub status: String,
    /// Operational state.
    pub state: ComponentStatus,
    /// Optional uptime in milliseconds (supervisor root only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
    /// Child components, sorted by id.
    pub children: Vec<ComponentInfo>,
}

impl ComponentInfo {
    /// A running node with children.
    pub fn running(id: &str, name: &str, children: Vec<ComponentInfo>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status: "running".to_string(),
            state: ComponentStatus::On,
            uptime_ms: None,
            children,
        }
    }

    /// A running leaf node (no children).
    pub fn leaf(id: &str, name: &str) -> Self {
        Self::running(id, name, vec![])
    }

    /// Capitalise the first character of a string — convenience for turning
    /// an id like `"courses"` into a display name like `"Courses"`.
    pub fn capitalise(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        }
    }
}
