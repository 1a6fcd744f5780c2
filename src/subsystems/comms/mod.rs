//! Comms subsystem: chat platform channels.
//!
//! # Architecture
//!
//! Each channel implements [`runtime::Component`] and is spawned as an
//! independent task by [`start`] via [`runtime::spawn_components`]. A channel
//! captures a [`RelayHandle`] at construction, builds its own
//! [`ChatPlatform`] once it has credentials, and feeds every inbound message
//! to the [`Dispatcher`](crate::subsystems::relay::Dispatcher) wired to that
//! platform.
//!
//! # Starting
//!
//! [`start`] is synchronous; it returns a [`SubsystemHandle`] as soon as
//! the tasks are spawned. The caller decides when (or whether) to await it.
//!
//! [`runtime::Component`]: crate::subsystems::runtime::Component
//! [`runtime::spawn_components`]: crate::subsystems::runtime::spawn_components

#[cfg(feature = "channel-discord")]
pub mod discord;
pub mod platform;
#[cfg(test)]
pub mod recording;

pub use platform::{
    Attachment, ChatPlatform, ConversationId, InboundMessage, MessageRef, Notice, Outbound, PlatformFuture,
    TypingGuard,
};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::subsystems::relay::RelayHandle;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

// ── start ─────────────────────────────────────────────────────────────────────

/// Spawn all configured channels and return a [`SubsystemHandle`].
///
/// If any channel exits with an error the shared `shutdown` token is
/// cancelled so siblings stop cooperatively. The handle resolves when all
/// channels have exited.
#[cfg_attr(not(feature = "channel-discord"), allow(unused_variables, unused_mut))]
pub fn start(config: &Config, relay: &RelayHandle, shutdown: CancellationToken) -> SubsystemHandle {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-discord")]
    {
        if config.comms_discord_should_load() {
            info!("loading discord channel");
            components.push(Box::new(discord::DiscordChannel::new("discord0", relay.clone())));
        }
    }

    if components.is_empty() {
        info!("no comms channels configured");
    }

    spawn_components(components, shutdown)
}
