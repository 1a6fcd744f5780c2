//! Inbound dispatch: access filter, clear command, enqueue.
//!
//! Runs on the platform's event task and never waits on the backend. Clear
//! commands are answered inline; everything else accepted is queued for the
//! relay worker.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::{AccessConfig, RelayConfig};
use crate::error::AppError;
use crate::subsystems::comms::{InboundMessage, Outbound};

use super::{Relay, RelayQueue};

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Filtered out; nothing sent, nothing stored.
    Ignored,
    Cleared,
    NothingToClear,
    Enqueued,
}

/// Which messages the bot answers.
///
/// Guild messages need an allow-listed guild and, when a keyword is set, a
/// channel name containing it. Direct messages need an allow-listed author.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_guilds: HashSet<u64>,
    allowed_dm_users: HashSet<u64>,
    channel_name_contains: Option<String>,
}

impl AccessPolicy {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            allowed_guilds: config.allowed_guilds.clone(),
            allowed_dm_users: config.allowed_dm_users.clone(),
            channel_name_contains: config.channel_name_contains.clone(),
        }
    }

    /// Whether a message from `guild_id` can only be judged by its channel
    /// name. Channels use this to skip name lookups for ignored guilds.
    pub fn needs_channel_name(&self, guild_id: u64) -> bool {
        self.channel_name_contains.is_some() && self.allowed_guilds.contains(&guild_id)
    }

    pub fn permits(&self, message: &InboundMessage) -> bool {
        if message.from_self {
            return false;
        }

        match message.guild_id {
            None => self.allowed_dm_users.contains(&message.author_id),
            Some(guild_id) => {
                if !self.allowed_guilds.contains(&guild_id) {
                    return false;
                }
                match (&self.channel_name_contains, &message.channel_name) {
                    (None, _) => true,
                    (Some(keyword), Some(name)) => name.contains(keyword.as_str()),
                    (Some(_), None) => false,
                }
            }
        }
    }
}

pub struct Dispatcher {
    relay: Arc<Relay>,
    queue: RelayQueue,
    policy: AccessPolicy,
    clear_command: String,
}

impl Dispatcher {
    pub fn new(relay: Arc<Relay>, queue: RelayQueue, config: &RelayConfig) -> Self {
        Self {
            relay,
            queue,
            policy: AccessPolicy::from_config(&config.access),
            clear_command: config.clear_command.clone(),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub async fn on_inbound(&self, message: InboundMessage) -> Result<Disposition, AppError> {
        let conversation_id = message.conversation_id();

        if !self.policy.permits(&message) {
            trace!(%conversation_id, author_id = message.author_id, "message filtered");
            return Ok(Disposition::Ignored);
        }

        if self.is_clear_command(&message.text) {
            return self.clear(message).await;
        }

        let label = format!("{conversation_id}/{}", message.id.message_id);
        let relay = self.relay.clone();
        self.queue.enqueue(label, async move { relay.process(message).await })?;
        debug!(%conversation_id, "message queued");
        Ok(Disposition::Enqueued)
    }

    fn is_clear_command(&self, text: &str) -> bool {
        !self.clear_command.is_empty() && text.trim() == self.clear_command
    }

    async fn clear(&self, message: InboundMessage) -> Result<Disposition, AppError> {
        let conversation_id = message.conversation_id();
        let (disposition, text) = if self.relay.clear_history(conversation_id) {
            info!(%conversation_id, "conversation history cleared");
            (Disposition::Cleared, "Conversation history cleared.")
        } else {
            (Disposition::NothingToClear, "No conversation history to clear.")
        };

        self.relay
            .platform()
            .send(conversation_id, Outbound::Text(text.into()))
            .await?;
        Ok(disposition)
    }
}
