//! Comms subsystem — manages all external I/O channels.
//!
//! # Architecture
//!
//! Each channel (PTY, axum HTTP) implements [`runtime::Component`] and is
//! spawned as an independent concurrent task by [`start`] via
//! [`runtime::spawn_components`].  Channels capture their shared
//! [`Arc<CommsState>`] at construction time — no state is passed through the
//! generic `Component::run` signature.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events).  This is drained in a short-lived
//! background task that dies naturally when all channel senders are dropped.
//!
//! # Starting
//!
//! [`start`] is synchronous — it returns a [`SubsystemHandle`] as soon as
//! the tasks are spawned.  The caller decides when (or whether) to await it.
//!
//! [`runtime::Component`]: crate::subsystems::runtime::Component
//! [`runtime::spawn_components`]: crate::subsystems::runtime::spawn_components

mod state;

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;

pub use state::{CommsEvent, CommsState};

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};
use crate::supervisor::bus::BusHandle;
use crate::supervisor::component_info::ComponentInfo;

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// Channels start immediately.  If any channel exits with an error the
/// shared `shutdown` token is cancelled so siblings stop cooperatively.
/// The handle resolves when all channels have exited.
///
/// `comms_info` is populated once the channel list is known; the management
/// subsystem injects it into the component tree (comms is not a bus
/// handler, so the supervisor cannot call `component_info()` on it).
pub fn start(
    config: &Config,
    bus: BusHandle,
    shutdown: CancellationToken,
    comms_info: Arc<OnceLock<ComponentInfo>>,
) -> SubsystemHandle {
    // Intra-subsystem event channel: channels → manager.
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(bus, event_tx));

    // Build the component list from config.  Each channel captures
    // Arc<CommsState> at construction; the generic Component::run signature
    // only needs the shutdown token.
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }
    #[cfg(not(feature = "channel-pty"))]
    if config.comms_pty_should_load() {
        tracing::warn!(
            "config has [comms.pty] enabled = true but this binary was compiled \
             without the `channel-pty` feature — channel will not start."
        );
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_axum_should_load() {
            info!(bind = %config.comms.axum_channel.bind, "loading axum channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "axum0",
                config.comms.axum_channel.bind.clone(),
                state.clone(),
            )));
        }
    }
    #[cfg(not(feature = "channel-axum"))]
    if config.comms_axum_should_load() {
        tracing::warn!(
            "config has [comms.axum_channel] enabled = true but this binary was compiled \
             without the `channel-axum` feature — channel will not start. \
             Rebuild with `--features channel-axum` or set enabled = false."
        );
    }

    if components.is_empty() {
        info!("no comms channels configured — waiting for shutdown");
    }

    // Snapshot the channel list into the component-info slot for the
    // management tree.
    {
        let channel_children: Vec<ComponentInfo> = components
            .iter()
            .map(|c| ComponentInfo::leaf(c.id(), &ComponentInfo::capitalise(c.id())))
            .collect();
        let _ = comms_info.set(ComponentInfo::running("comms", "Comms", channel_children));
    }

    // Spawn a background event drain: consumes CommsEvent until all channel
    // senders are dropped (i.e. all channels have exited).
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
            }
        }
    });

    // Delegate component lifecycle (JoinSet + error propagation + shutdown
    // cancellation) entirely to the generic runtime helper.
    spawn_components(components, shutdown)
}
