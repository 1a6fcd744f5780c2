//! In-memory [`ChatPlatform`] for tests: records every outbound call.

use std::sync::{Arc, Mutex};

use super::platform::{ChatPlatform, ConversationId, MessageRef, Outbound, PlatformFuture, TypingGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Send(ConversationId, Outbound),
    Reply(MessageRef, Outbound),
    Typing(ConversationId),
}

#[derive(Debug, Default, Clone)]
pub struct RecordingPlatform {
    events: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    /// Outbound messages only, typing indicators dropped.
    pub fn outbound(&self) -> Vec<Recorded> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Recorded::Typing(_)))
            .collect()
    }
}

impl ChatPlatform for RecordingPlatform {
    fn send(&self, conversation_id: ConversationId, body: Outbound) -> PlatformFuture<'_> {
        self.events.lock().unwrap().push(Recorded::Send(conversation_id, body));
        Box::pin(async { Ok(()) })
    }

    fn reply(&self, to: MessageRef, body: Outbound) -> PlatformFuture<'_> {
        self.events.lock().unwrap().push(Recorded::Reply(to, body));
        Box::pin(async { Ok(()) })
    }

    fn start_typing(&self, conversation_id: ConversationId) -> TypingGuard {
        self.events.lock().unwrap().push(Recorded::Typing(conversation_id));
        Box::new(())
    }
}
