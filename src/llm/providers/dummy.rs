//! Dummy LLM provider: echoes the latest user turn back prefixed with `[echo]`.
//! Used for running the full relay loop without a real API key.

use crate::llm::{ImageRequest, ProviderError, Role, Turn};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn chat_completion(
        &self,
        _model: &str,
        messages: &[Turn],
        _max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.text())
            .unwrap_or_default();
        Ok(format!("[echo] {last_user}"))
    }

    pub async fn image_generate(
        &self,
        _model: &str,
        _prompt: &str,
        _request: &ImageRequest,
    ) -> Result<String, ProviderError> {
        Ok("https://example.invalid/dummy.png".to_string())
    }
}
