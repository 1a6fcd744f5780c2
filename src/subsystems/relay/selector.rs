//! Picks the backend model for an inbound message.
//!
//! Attachments go to the vision model. Otherwise a short classification
//! call asks the classifier model whether the text requests an image; a
//! failed classification counts as "no".

use tracing::{debug, warn};

use crate::config::ModelsConfig;
use crate::llm::{Content, LlmProvider, ProviderError, Turn};
use crate::subsystems::comms::InboundMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    Text(String),
    Vision(String),
    Image(String),
}

pub async fn select(provider: &LlmProvider, models: &ModelsConfig, message: &InboundMessage) -> ModelChoice {
    if !message.attachments.is_empty() {
        return ModelChoice::Vision(models.vision.clone());
    }

    if message.text.trim().is_empty() {
        return ModelChoice::Text(models.text.clone());
    }

    let wants_image = match is_image_request(provider, models, &message.text).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(conversation_id = %message.conversation_id(), error = %e, "image-request classification failed, assuming text");
            false
        }
    };

    if wants_image {
        ModelChoice::Image(models.image.clone())
    } else {
        ModelChoice::Text(models.text.clone())
    }
}

/// Ask the classifier model whether `prompt` is a request to generate an image.
pub async fn is_image_request(
    provider: &LlmProvider,
    models: &ModelsConfig,
    prompt: &str,
) -> Result<bool, ProviderError> {
    let question = format!(
        "Determine if the following input is a request to generate an image. \
         Respond with either 'Yes' or 'No'.\n\nInput: {prompt}"
    );
    let answer = provider
        .chat_completion(
            &models.classifier,
            &[Turn::user(Content::Plain(question))],
            models.classifier_max_tokens,
        )
        .await?;
    let yes = is_yes(&answer);
    debug!(%answer, yes, "image-request classification");
    Ok(yes)
}

fn is_yes(answer: &str) -> bool {
    answer
        .trim()
        .trim_end_matches(['.', '!'])
        .eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::llm::providers::scripted::{ScriptedCall, ScriptedProvider};
    use crate::subsystems::comms::{Attachment, ConversationId, MessageRef};

    fn message(text: &str, attachments: Vec<Attachment>) -> InboundMessage {
        InboundMessage {
            id: MessageRef { conversation_id: ConversationId(3), message_id: 30 },
            author_id: 9,
            guild_id: Some(1),
            channel_name: Some("gpt-chat".into()),
            text: text.into(),
            attachments,
            from_self: false,
        }
    }

    fn png() -> Attachment {
        Attachment {
            content_type: Some("image/png".into()),
            filename: "a.png".into(),
            url: "https://cdn.example/a.png".into(),
        }
    }

    #[test]
    fn yes_parsing_is_lenient_about_case_and_punctuation() {
        assert!(is_yes("Yes"));
        assert!(is_yes(" yes.\n"));
        assert!(!is_yes("No"));
        assert!(!is_yes("Yes, it is"));
    }

    #[tokio::test]
    async fn attachments_pick_vision_without_classifying() {
        let script = ScriptedProvider::new();
        let provider = LlmProvider::Scripted(script.clone());
        let models = RelayConfig::test_default().models;

        let choice = select(&provider, &models, &message("look", vec![png()])).await;
        assert_eq!(choice, ModelChoice::Vision("vision-model".into()));
        assert!(script.calls().is_empty());
    }

    #[tokio::test]
    async fn yes_answer_picks_image_model() {
        let script = ScriptedProvider::new();
        script.push_chat(Ok("Yes".into()));
        let provider = LlmProvider::Scripted(script.clone());
        let models = RelayConfig::test_default().models;

        let choice = select(&provider, &models, &message("draw a cat", vec![])).await;
        assert_eq!(choice, ModelChoice::Image("image-model".into()));

        match &script.calls()[0] {
            ScriptedCall::Chat { model, messages, max_tokens } => {
                assert_eq!(model, "classifier-model");
                assert_eq!(*max_tokens, 30);
                assert!(messages[0].content.text().ends_with("Input: draw a cat"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_answer_picks_text_model() {
        let script = ScriptedProvider::new();
        script.push_chat(Ok("No".into()));
        let provider = LlmProvider::Scripted(script);
        let models = RelayConfig::test_default().models;

        let choice = select(&provider, &models, &message("hello", vec![])).await;
        assert_eq!(choice, ModelChoice::Text("text-model".into()));
    }

    #[tokio::test]
    async fn classification_error_falls_back_to_text() {
        let script = ScriptedProvider::new();
        script.push_chat(Err(ProviderError::Service("HTTP 503".into())));
        let provider = LlmProvider::Scripted(script);
        let models = RelayConfig::test_default().models;

        let err = is_image_request(&provider, &models, "draw").await;
        assert!(err.is_err());

        let script = ScriptedProvider::new();
        script.push_chat(Err(ProviderError::Service("HTTP 503".into())));
        let provider = LlmProvider::Scripted(script);
        let choice = select(&provider, &models, &message("draw a dog", vec![])).await;
        assert_eq!(choice, ModelChoice::Text("text-model".into()));
    }

    #[tokio::test]
    async fn blank_text_skips_classification() {
        let script = ScriptedProvider::new();
        let provider = LlmProvider::Scripted(script.clone());
        let models = RelayConfig::test_default().models;

        let choice = select(&provider, &models, &message("   ", vec![])).await;
        assert_eq!(choice, ModelChoice::Text("text-model".into()));
        assert!(script.calls().is_empty());
    }
}
