use serde::{Deserialize, Serialize};

/// A configured news feed. The url identifies it; the label is what readers see.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub label: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
}

/// Markup flavour of an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Html,
    Markdown,
}

impl Dialect {
    /// Value of Telegram's `parse_mode` field.
    pub fn parse_mode(&self) -> &'static str {
        match self {
            Dialect::Html => "HTML",
            Dialect::Markdown => "Markdown",
        }
    }
}

/// A chat destination and the bot token allowed to post to it.
///
/// Tokens are per recipient, so `Debug` leaves them out.
#[derive(Clone, PartialEq, Eq)]
pub struct RecipientEndpoint {
    pub chat_id: String,
    pub auth_token: String,
}

impl std::fmt::Debug for RecipientEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientEndpoint")
            .field("chat_id", &self.chat_id)
            .field("auth_token", &"***")
            .finish()
    }
}

/// A directory user who has opted in to Telegram delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub owner_id: String,
    pub endpoint: RecipientEndpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub chat_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(chat_id: &str) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(chat_id: &str, error: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}
