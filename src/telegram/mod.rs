//! Chat transport boundary: Telegram Bot API types, the inbound event shape
//! consumed by the conversation engine, and the outbound `Notifier` seam.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;
mod poller;

pub use client::TelegramClient;
pub use poller::run_update_poller;

/// One inbound chat event, already reduced to what the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub chat_id: i64,
    pub kind: ChatEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventKind {
    /// `/start`, `/remove`, or anything else prefixed with a slash
    /// (bot-mention suffix already stripped).
    Command(String),
    /// Plain text message.
    Text(String),
    /// Inline-button press payload ("5" or "10").
    Callback(String),
}

/// Outbound messages. Implemented by [`TelegramClient`]; faked in tests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Text message with a one-row inline keyboard of (label, payload) pairs.
    async fn send_choice(
        &self,
        chat_id: i64,
        text: &str,
        choices: &[(String, String)],
    ) -> Result<()>;
}

// --- Bot API wire types ---

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub description: Option<String>,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl Update {
    /// Reduce a raw update to a [`ChatEvent`], dropping anything the engine
    /// has no use for (edits, stickers, empty callbacks).
    pub fn into_event(self) -> Option<ChatEvent> {
        if let Some(callback) = self.callback_query {
            let chat_id = callback.message.as_ref()?.chat.id;
            let payload = callback.data?;
            return Some(ChatEvent {
                chat_id,
                kind: ChatEventKind::Callback(payload),
            });
        }

        let message = self.message?;
        let text = message.text?;
        let chat_id = message.chat.id;

        if let Some(command) = parse_command(&text) {
            return Some(ChatEvent {
                chat_id,
                kind: ChatEventKind::Command(command),
            });
        }

        Some(ChatEvent {
            chat_id,
            kind: ChatEventKind::Text(text),
        })
    }
}

fn parse_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let first = rest.split_whitespace().next().unwrap_or("");
    if first.is_empty() {
        return None;
    }
    // "/start@my_bot" arrives in group chats; the suffix is noise here.
    let name = first.split('@').next().unwrap_or(first);
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_update(chat_id: i64, text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                chat: Chat { id: chat_id },
                text: Some(text.to_string()),
            }),
            callback_query: None,
        }
    }

    #[test]
    fn command_with_bot_suffix_is_stripped() {
        let event = text_update(10, "/start@passtrack_bot").into_event().unwrap();
        assert_eq!(event.kind, ChatEventKind::Command("start".into()));
        assert_eq!(event.chat_id, 10);
    }

    #[test]
    fn plain_text_stays_text() {
        let event = text_update(10, "2000123456").into_event().unwrap();
        assert_eq!(event.kind, ChatEventKind::Text("2000123456".into()));
    }

    #[test]
    fn callback_uses_origin_chat() {
        let update = Update {
            update_id: 2,
            message: None,
            callback_query: Some(CallbackQuery {
                id: "cb".into(),
                data: Some("5".into()),
                message: Some(Message {
                    chat: Chat { id: 77 },
                    text: None,
                }),
            }),
        };
        let event = update.into_event().unwrap();
        assert_eq!(event.chat_id, 77);
        assert_eq!(event.kind, ChatEventKind::Callback("5".into()));
    }

    #[test]
    fn non_message_update_is_dropped() {
        let update = Update {
            update_id: 3,
            message: None,
            callback_query: None,
        };
        assert!(update.into_event().is_none());
    }
}
