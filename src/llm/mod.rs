//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! Async is delegated to the underlying provider; methods are `async fn` on
//! the enum so callers need no trait-object machinery.

pub mod message;
pub mod providers;

use thiserror::Error;

pub use message::{Content, Part, Role, Turn};

// ── Error ─────────────────────────────────────────────────────────────────────

/// Backend failure, split the way the relay reports it to users.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    /// The backend rejected the request itself (bad key, bad payload).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The backend or the path to it failed.
    #[error("service error: {0}")]
    Service(String),
    #[error("{0}")]
    Other(String),
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Image-generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub size: String,
    pub quality: String,
    pub count: u32,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new match arms.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    #[cfg(test)]
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmProvider {
    /// Run a chat completion over `messages` and return the reply text.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[Turn],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.chat_completion(model, messages, max_tokens).await,
            LlmProvider::OpenAiCompatible(p) => p.chat_completion(model, messages, max_tokens).await,
            #[cfg(test)]
            LlmProvider::Scripted(p) => p.chat_completion(model, messages, max_tokens).await,
        }
    }

    /// Generate an image for `prompt` and return the url of the first result.
    pub async fn image_generate(
        &self,
        model: &str,
        prompt: &str,
        request: &ImageRequest,
    ) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.image_generate(model, prompt, request).await,
            LlmProvider::OpenAiCompatible(p) => p.image_generate(model, prompt, request).await,
            #[cfg(test)]
            LlmProvider::Scripted(p) => p.image_generate(model, prompt, request).await,
        }
    }
}
