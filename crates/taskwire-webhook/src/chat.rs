use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Inbound webhook payload. Only the fields the bot reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// Chat id and non-empty text, when the update carries a text message.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        Some((message.chat.id, text))
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChatError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Bot API client for `sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(token: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_api_base(token, Self::DEFAULT_API_BASE)
    }

    pub fn with_api_base(token: impl Into<String>, api_base: &str) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("taskwire-webhook/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChatError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .http
            .post(url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(chat_id, "reply sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_text_message() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 9,
                "chat": { "id": 42, "type": "private" },
                "text": " /list "
            }
        }))
        .expect("decode");
        assert_eq!(update.text_message(), Some((42, "/list")));
    }

    #[test]
    fn updates_without_text_are_ignored() {
        let sticker: Update = serde_json::from_value(json!({
            "update_id": 2,
            "message": { "chat": { "id": 42 }, "sticker": {} }
        }))
        .expect("decode");
        assert_eq!(sticker.text_message(), None);

        let edited: Update = serde_json::from_value(json!({ "update_id": 3, "edited_message": {} }))
            .expect("decode");
        assert_eq!(edited.text_message(), None);
    }
}
