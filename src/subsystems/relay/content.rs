//! Builds the user-turn [`Content`] for an inbound message.

use thiserror::Error;

use crate::llm::{Content, Part};
use crate::subsystems::comms::InboundMessage;

/// Attachment media types the vision model accepts.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("The file uploaded '{filename}' is not an accepted file type.")]
    UnsupportedAttachment { filename: String },
}

/// Plain text for text-only messages; text part followed by one image part
/// per attachment otherwise. Any disallowed attachment fails the whole build.
pub fn build(message: &InboundMessage) -> Result<Content, ContentError> {
    if message.attachments.is_empty() {
        return Ok(Content::Plain(message.text.clone()));
    }

    let mut parts = Vec::with_capacity(message.attachments.len() + 1);
    parts.push(Part::Text(message.text.clone()));

    for attachment in &message.attachments {
        if !is_allowed(attachment.content_type.as_deref()) {
            return Err(ContentError::UnsupportedAttachment { filename: attachment.filename.clone() });
        }
        parts.push(Part::ImageRef(attachment.url.clone()));
    }

    Ok(Content::Multipart(parts))
}

fn is_allowed(content_type: Option<&str>) -> bool {
    // Platforms may append parameters, e.g. `image/png; charset=binary`.
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ALLOWED_MIME_TYPES.contains(&ct.trim()))
        .unwrap_or(false)
}
