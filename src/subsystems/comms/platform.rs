//! Chat-platform boundary: what the relay sees of Discord.
//!
//! Channels translate platform events into [`InboundMessage`]s and implement
//! [`ChatPlatform`] for the outbound side. The relay never touches platform
//! SDK types directly.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;

/// Conversation key: one history per platform channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Points at one inbound message so replies can thread onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub conversation_id: ConversationId,
    pub message_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Declared media type; `None` when the platform did not report one.
    pub content_type: Option<String>,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageRef,
    pub author_id: u64,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub channel_name: Option<String>,
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// Authored by the bot account itself.
    pub from_self: bool,
}

impl InboundMessage {
    pub fn conversation_id(&self) -> ConversationId {
        self.id.conversation_id
    }
}

/// Titled notice, rendered by platforms as an error embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn error(title: impl Into<String>, error: impl fmt::Display) -> Self {
        Self { title: title.into(), description: format!("An error occurred: {error}") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Notice(Notice),
}

/// Future returned by [`ChatPlatform`] send operations.
pub type PlatformFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

/// Keeps the typing indicator alive until dropped.
pub type TypingGuard = Box<dyn Any + Send>;

/// Outbound half of a chat platform.
pub trait ChatPlatform: Send + Sync + 'static {
    /// Post `body` into a conversation.
    fn send(&self, conversation_id: ConversationId, body: Outbound) -> PlatformFuture<'_>;

    /// Post `body` as a reply to `to`, without pinging its author.
    fn reply(&self, to: MessageRef, body: Outbound) -> PlatformFuture<'_>;

    /// Show a "typing" indicator in the conversation until the guard drops.
    fn start_typing(&self, conversation_id: ConversationId) -> TypingGuard;
}
