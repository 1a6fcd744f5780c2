//! OpenAI-compatible provider (`/chat/completions`, `/images/generations`).
//!
//! All OpenAI wire types are private to this module; callers only see
//! [`Turn`]s going in and strings coming out. Failures are sorted into the
//! [`ProviderError`] kinds the relay reports to users: HTTP 400 is
//! `InvalidRequest`, any other HTTP error or transport failure is `Service`,
//! and a body that cannot be decoded is `Other`.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{Content, ImageRequest, Part, ProviderError, Turn};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing the OpenAI REST surface.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request. Without
    /// `timeout_seconds` requests never time out.
    pub fn new(
        api_base_url: String,
        timeout_seconds: Option<u64>,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, api_key })
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[Turn],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens,
        };

        debug!(%model, messages = messages.len(), max_tokens, "sending chat completion request");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full chat completion payload");
        }

        let parsed: ChatCompletionResponse = self.post_json("chat/completions", &payload).await?;
        debug!(choices = parsed.choices.len(), "received chat completion");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Other("empty or missing content in response".into()))
    }

    pub async fn image_generate(
        &self,
        model: &str,
        prompt: &str,
        request: &ImageRequest,
    ) -> Result<String, ProviderError> {
        let payload = ImageGenerationRequest {
            model,
            prompt,
            size: &request.size,
            quality: &request.quality,
            n: request.count,
        };

        debug!(%model, size = %request.size, "sending image generation request");

        let parsed: ImageGenerationResponse =
            self.post_json("images/generations", &payload).await?;

        parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| ProviderError::Other("no image url in response".into()))
    }

    async fn post_json<Req, Resp>(&self, path: &str, payload: &Req) -> Result<Resp, ProviderError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{path}", self.api_base_url);
        let mut req = self.client.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(%url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Service(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            let err = classify_failure(status, &body);
            error!(%status, error = %err, "LLM request returned HTTP error");
            return Err(err);
        }

        response.json::<Resp>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Other(format!("failed to parse response body: {e}"))
        })
    }
}

/// Turn a non-success status and its body into a [`ProviderError`].
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    if status == StatusCode::BAD_REQUEST {
        ProviderError::InvalidRequest(message)
    } else {
        ProviderError::Service(message)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: WireContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<WirePart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: WireImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct WireImageUrl<'a> {
    url: &'a str,
}

impl<'a> From<&'a Turn> for WireMessage<'a> {
    fn from(turn: &'a Turn) -> Self {
        let content = match &turn.content {
            Content::Plain(text) => WireContent::Text(text),
            Content::Multipart(parts) => WireContent::Parts(
                parts
                    .iter()
                    .map(|p| match p {
                        Part::Text(text) => WirePart::Text { text },
                        Part::ImageRef(url) => WirePart::ImageUrl { image_url: WireImageUrl { url } },
                    })
                    .collect(),
            ),
        };
        Self { role: turn.role.as_str(), content }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}
