//! Relay subsystem: turns chat messages into completion calls and back.
//!
//! ```text
//! Dispatcher::on_inbound ──filter──▶ RelayQueue ──▶ RelayWorker
//!                                                     │
//!                     Relay::process ◀────────────────┘
//!                       selector → content → history → provider → chunk → reply
//! ```
//!
//! [`Relay`] is the owned service object: it holds the provider, the
//! platform handle and the per-conversation [`HistoryStore`]. Only the
//! worker's current task touches the history (plus the clear command), so
//! the mutex is uncontended and never held across an await.

pub mod chunk;
pub mod content;
pub mod dispatch;
pub mod history;
pub mod queue;
pub mod selector;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::llm::{ImageRequest, LlmProvider, ProviderError, Turn};
use crate::subsystems::comms::{ChatPlatform, ConversationId, InboundMessage, Notice, Outbound};

pub use dispatch::{AccessPolicy, Dispatcher, Disposition};
pub use history::HistoryStore;
pub use queue::{RelayQueue, RelayWorker};
pub use selector::ModelChoice;

// ── start ─────────────────────────────────────────────────────────────────────

/// Everything a channel needs to build its [`Dispatcher`].
#[derive(Clone)]
pub struct RelayHandle {
    config: RelayConfig,
    provider: LlmProvider,
    queue: RelayQueue,
}

impl RelayHandle {
    /// Wire a dispatcher whose replies go out through `platform`.
    pub fn dispatcher(&self, platform: Arc<dyn ChatPlatform>) -> Dispatcher {
        let relay = Arc::new(Relay::new(platform, self.provider.clone(), self.config.clone()));
        Dispatcher::new(relay, self.queue.clone(), &self.config)
    }
}

/// Create the relay queue. The returned worker must be run (as a component)
/// for queued messages to be processed.
pub fn start(config: &RelayConfig, provider: LlmProvider) -> (RelayHandle, RelayWorker) {
    let (queue, worker) = RelayQueue::new();
    info!(
        budget = config.history_char_budget,
        chunk_max_len = config.chunk_max_len,
        text_model = %config.models.text,
        "relay ready"
    );
    (RelayHandle { config: config.clone(), provider, queue }, worker)
}

// ── Relay ─────────────────────────────────────────────────────────────────────

pub struct Relay {
    platform: Arc<dyn ChatPlatform>,
    provider: LlmProvider,
    config: RelayConfig,
    history: Mutex<HistoryStore>,
}

impl Relay {
    pub fn new(platform: Arc<dyn ChatPlatform>, provider: LlmProvider, config: RelayConfig) -> Self {
        let history = Mutex::new(HistoryStore::new(config.system_prompt.clone()));
        Self { platform, provider, config, history }
    }

    pub fn platform(&self) -> &dyn ChatPlatform {
        self.platform.as_ref()
    }

    /// Remove a conversation's history. `false` = there was none.
    pub fn clear_history(&self, conversation_id: ConversationId) -> bool {
        self.history().clear(conversation_id)
    }

    pub fn history_snapshot(&self, conversation_id: ConversationId) -> Option<Vec<Turn>> {
        self.history().get(conversation_id).map(<[Turn]>::to_vec)
    }

    fn history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full pipeline for one accepted message. Backend and validation
    /// failures are reported to the user and return `Ok`; only platform
    /// delivery failures surface as `Err`.
    pub async fn process(&self, message: InboundMessage) -> Result<(), AppError> {
        let choice = {
            let _typing = self.platform.start_typing(message.conversation_id());
            selector::select(&self.provider, &self.config.models, &message).await
        };

        debug!(conversation_id = %message.conversation_id(), ?choice, "model selected");

        match choice {
            ModelChoice::Image(model) => self.relay_image(&message, &model).await,
            ModelChoice::Text(model) | ModelChoice::Vision(model) => self.relay_chat(&message, &model).await,
        }
    }

    async fn relay_image(&self, message: &InboundMessage, model: &str) -> Result<(), AppError> {
        let request = ImageRequest {
            size: self.config.image.size.clone(),
            quality: self.config.image.quality.clone(),
            count: self.config.image.count,
        };

        let result = {
            let _typing = self.platform.start_typing(message.conversation_id());
            self.provider.image_generate(model, &message.text, &request).await
        };

        match result {
            Ok(url) => {
                info!(conversation_id = %message.conversation_id(), %model, "image generated");
                self.platform.reply(message.id, Outbound::Text(url)).await
            }
            Err(e) => self.report_provider_error(message, &e).await,
        }
    }

    async fn relay_chat(&self, message: &InboundMessage, model: &str) -> Result<(), AppError> {
        let conversation_id = message.conversation_id();

        let content = match content::build(message) {
            Ok(content) => content,
            Err(e) => {
                warn!(%conversation_id, error = %e, "rejected attachment");
                let notice = Notice::error("Bad File Upload", &e);
                return self.platform.reply(message.id, Outbound::Notice(notice)).await;
            }
        };

        let user_turn = Turn::user(content);
        let (request, stored) = {
            let mut store = self.history();
            let turns = store.get_or_create(conversation_id);
            turns.push(user_turn.clone());
            history::trim(turns, self.config.history_char_budget);
            if turns.last() == Some(&user_turn) {
                (turns.clone(), true)
            } else {
                warn!(%conversation_id, "message exceeds the history budget on its own, sending without context");
                (vec![Turn::system(self.config.system_prompt.clone()), user_turn], false)
            }
        };

        debug!(%conversation_id, %model, turns = request.len(), chars = history::total_len(&request), "requesting completion");

        let result = {
            let _typing = self.platform.start_typing(conversation_id);
            self.provider
                .chat_completion(model, &request, self.config.models.max_tokens)
                .await
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => return self.report_provider_error(message, &e).await,
        };

        if let Err(e) = self.send_chunks(message, model, &reply).await {
            error!(%conversation_id, error = ?e, "failed to deliver reply");
            let notice = Notice::error("Unexpected Error", "An unexpected error occurred.");
            let _ = self.platform.reply(message.id, Outbound::Notice(notice)).await;
            return Ok(());
        }

        if stored && !self.history().append(conversation_id, Turn::assistant(reply)) {
            debug!(%conversation_id, "history cleared while replying, assistant turn dropped");
        }
        Ok(())
    }

    async fn send_chunks(&self, message: &InboundMessage, model: &str, reply: &str) -> Result<(), AppError> {
        let mut chunks = chunk::split(reply, self.config.chunk_max_len);
        if let Some(last) = chunks.last_mut() {
            last.push_str(&chunk::footer(model, &self.config.system_prompt));
        }

        let count = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 && !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
            self.platform.reply(message.id, Outbound::Text(chunk)).await?;
        }

        info!(conversation_id = %message.conversation_id(), %model, chunks = count, "reply delivered");
        Ok(())
    }

    async fn report_provider_error(&self, message: &InboundMessage, err: &ProviderError) -> Result<(), AppError> {
        let conversation_id = message.conversation_id();
        let notice = match err {
            ProviderError::InvalidRequest(detail) => {
                error!(%conversation_id, %detail, "completion request rejected");
                Notice::error(
                    "Bad Request",
                    "There was an issue with the request to the completion service. \
                     Please check the API key and try again.",
                )
            }
            ProviderError::Service(detail) => {
                error!(%conversation_id, %detail, "completion service error");
                Notice::error("Service Error", "An error occurred with the completion service.")
            }
            ProviderError::UnknownProvider(_) | ProviderError::Other(_) => {
                error!(%conversation_id, error = ?err, "unexpected completion failure");
                Notice::error("Unexpected Error", "An unexpected error occurred.")
            }
        };
        self.platform.reply(message.id, Outbound::Notice(notice)).await
    }
}
