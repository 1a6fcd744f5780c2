//! Discord comms channel: gateway events in, REST replies out.
//!
//! Inbound messages are converted to [`InboundMessage`] and handed to the
//! relay dispatcher on the gateway's event task. Outbound traffic goes
//! through [`DiscordPlatform`], a thin [`ChatPlatform`] over serenity's
//! `Http` client.

use std::env;
use std::sync::Arc;

use serenity::all::{
    ChannelId, Client, Colour, Context, CreateAllowedMentions, CreateEmbed, CreateMessage, EventHandler,
    GatewayIntents, Http, Message, MessageId, Ready,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::AppError;
use crate::subsystems::relay::{Dispatcher, RelayHandle};
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::platform::{
    Attachment, ChatPlatform, ConversationId, InboundMessage, MessageRef, Outbound, PlatformFuture, TypingGuard,
};

// ── DiscordChannel ────────────────────────────────────────────────────────────

pub struct DiscordChannel {
    channel_id: String,
    relay: RelayHandle,
}

impl DiscordChannel {
    pub fn new(channel_id: impl Into<String>, relay: RelayHandle) -> Self {
        Self { channel_id: channel_id.into(), relay }
    }
}

impl Component for DiscordChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_discord(self.channel_id, self.relay, shutdown))
    }
}

// ── run_discord ───────────────────────────────────────────────────────────────

async fn run_discord(channel_id: String, relay: RelayHandle, shutdown: CancellationToken) -> Result<(), AppError> {
    let token = match env::var("DISCORD_TOKEN") {
        Ok(t) if !t.trim().is_empty() => t,
        _ => {
            warn!(%channel_id, "DISCORD_TOKEN not set, discord channel exiting");
            return Ok(());
        }
    };

    info!(%channel_id, "discord channel starting");

    let platform = Arc::new(DiscordPlatform::new(Arc::new(Http::new(&token))));
    let handler = Handler { channel_id: channel_id.clone(), dispatcher: relay.dispatcher(platform) };

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| AppError::Comms(format!("discord client setup failed: {e}")))?;
    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received, closing discord channel");
            shard_manager.shutdown_all().await;
        }
        res = client.start() => match res {
            Ok(()) => warn!(%channel_id, "discord gateway exited unexpectedly"),
            Err(e) => return Err(AppError::Comms(format!("discord gateway error: {e}"))),
        },
    }

    Ok(())
}

// ── Handler ───────────────────────────────────────────────────────────────────

struct Handler {
    channel_id: String,
    dispatcher: Dispatcher,
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(channel_id = %self.channel_id, user = %ready.user.name, guilds = ready.guilds.len(), "discord connected");
    }

    /// Serenity runs each event on its own task, so two messages arriving
    /// back to back may reach the relay queue in either order.
    async fn message(&self, ctx: Context, msg: Message) {
        let resolve_name = msg
            .guild_id
            .is_some_and(|g| self.dispatcher.policy().needs_channel_name(g.get()));
        let inbound = to_inbound(&ctx, &msg, resolve_name).await;
        trace!(channel_id = %self.channel_id, conversation_id = %inbound.conversation_id(), "discord received message");

        match self.dispatcher.on_inbound(inbound).await {
            Ok(disposition) => debug!(channel_id = %self.channel_id, ?disposition, "message dispatched"),
            Err(e) => warn!(channel_id = %self.channel_id, error = %e, "failed to dispatch discord message"),
        }
    }
}

/// `resolve_name` may cost a REST call on a cache miss; only set it when the
/// access filter actually looks at the name.
async fn to_inbound(ctx: &Context, msg: &Message, resolve_name: bool) -> InboundMessage {
    let channel_name = if resolve_name { msg.channel_id.name(ctx).await.ok() } else { None };

    InboundMessage {
        id: MessageRef { conversation_id: ConversationId(msg.channel_id.get()), message_id: msg.id.get() },
        author_id: msg.author.id.get(),
        guild_id: msg.guild_id.map(|g| g.get()),
        channel_name,
        text: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment { content_type: a.content_type.clone(), filename: a.filename.clone(), url: a.url.clone() })
            .collect(),
        from_self: msg.author.id == ctx.cache.current_user().id,
    }
}

// ── DiscordPlatform ───────────────────────────────────────────────────────────

pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl ChatPlatform for DiscordPlatform {
    fn send(&self, conversation_id: ConversationId, body: Outbound) -> PlatformFuture<'_> {
        Box::pin(async move {
            ChannelId::new(conversation_id.0)
                .send_message(&*self.http, render(body))
                .await
                .map_err(|e| AppError::Comms(format!("discord send failed: {e}")))?;
            Ok(())
        })
    }

    fn reply(&self, to: MessageRef, body: Outbound) -> PlatformFuture<'_> {
        Box::pin(async move {
            let channel = ChannelId::new(to.conversation_id.0);
            let builder = render(body)
                .reference_message((channel, MessageId::new(to.message_id)))
                .allowed_mentions(CreateAllowedMentions::new().replied_user(false));
            channel
                .send_message(&*self.http, builder)
                .await
                .map_err(|e| AppError::Comms(format!("discord reply failed: {e}")))?;
            Ok(())
        })
    }

    fn start_typing(&self, conversation_id: ConversationId) -> TypingGuard {
        Box::new(ChannelId::new(conversation_id.0).start_typing(&self.http))
    }
}

fn render(body: Outbound) -> CreateMessage {
    match body {
        Outbound::Text(text) => CreateMessage::new().content(text),
        Outbound::Notice(notice) => CreateMessage::new().embed(
            CreateEmbed::new()
                .title(notice.title)
                .description(notice.description)
                .colour(Colour::RED),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::comms::Notice;

    #[test]
    fn text_renders_as_content() {
        let json = serde_json::to_value(render(Outbound::Text("hello".into()))).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("embeds").map_or(true, |e| e.as_array().is_some_and(Vec::is_empty)));
    }

    #[test]
    fn notice_renders_as_embed() {
        let notice = Notice::error("Service Error", "upstream down");
        let json = serde_json::to_value(render(Outbound::Notice(notice))).unwrap();
        assert_eq!(json["embeds"][0]["title"], "Service Error");
        assert_eq!(json["embeds"][0]["description"], "An error occurred: upstream down");
    }
}
