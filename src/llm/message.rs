//! Provider-neutral conversation model.
//!
//! A [`Turn`] is one message's contribution to a conversation. Its
//! [`Content`] is either plain text or an ordered list of [`Part`]s when the
//! message carried image attachments.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Publicly reachable image url.
    ImageRef(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Plain(String),
    Multipart(Vec<Part>),
}

impl Content {
    /// Characters counted against the history budget: text plus image urls.
    pub fn char_len(&self) -> usize {
        match self {
            Content::Plain(text) => text.chars().count(),
            Content::Multipart(parts) => parts
                .iter()
                .map(|p| match p {
                    Part::Text(t) | Part::ImageRef(t) => t.chars().count(),
                })
                .sum(),
        }
    }

    /// Concatenated text parts, ignoring images.
    pub fn text(&self) -> String {
        match self {
            Content::Plain(text) => text.clone(),
            Content::Multipart(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    Part::Text(t) => Some(t.as_str()),
                    Part::ImageRef(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: Content,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: Content::Plain(text.into()) }
    }

    pub fn user(content: Content) -> Self {
        Self { role: Role::User, content }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: Content::Plain(text.into()) }
    }

    pub fn char_len(&self) -> usize {
        self.content.char_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_len_counts_chars_not_bytes() {
        assert_eq!(Content::Plain("héllo".into()).char_len(), 5);
    }

    #[test]
    fn multipart_len_sums_text_and_urls() {
        let c = Content::Multipart(vec![
            Part::Text("look".into()),
            Part::ImageRef("http://x/a.png".into()),
        ]);
        assert_eq!(c.char_len(), 4 + 14);
        assert_eq!(c.text(), "look");
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
