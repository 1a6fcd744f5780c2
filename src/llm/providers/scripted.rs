//! Scripted provider for tests: replays queued results and records every call.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::{ImageRequest, ProviderError, Turn};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedCall {
    Chat { model: String, messages: Vec<Turn>, max_tokens: u32 },
    Image { model: String, prompt: String },
}

#[derive(Debug, Default)]
struct Script {
    chat: VecDeque<Result<String, ProviderError>>,
    images: VecDeque<Result<String, ProviderError>>,
    calls: Vec<ScriptedCall>,
}

/// Clones share the same script, so a test can keep one handle for
/// inspection after moving another into the relay.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chat(&self, result: Result<String, ProviderError>) -> &Self {
        self.script.lock().unwrap().chat.push_back(result);
        self
    }

    pub fn push_image(&self, result: Result<String, ProviderError>) -> &Self {
        self.script.lock().unwrap().images.push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[Turn],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ScriptedCall::Chat {
            model: model.to_string(),
            messages: messages.to_vec(),
            max_tokens,
        });
        script
            .chat
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
    }

    pub async fn image_generate(
        &self,
        model: &str,
        prompt: &str,
        _request: &ImageRequest,
    ) -> Result<String, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(ScriptedCall::Image {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        script
            .images
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
    }
}
