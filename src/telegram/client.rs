use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{
    ApiResponse, InlineKeyboardButton, InlineKeyboardMarkup, Notifier, Update, User,
};

/// Seconds the Bot API holds a `getUpdates` request open before answering
/// with an empty batch.
const LONG_POLL_SECS: u64 = 60;

pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(token: &str, request_timeout: Duration) -> Result<Self> {
        // No client-wide timeout: the long-poll request needs to outlive the
        // per-request bound used for sends.
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{token}"),
            request_timeout,
        })
    }

    /// Verify the token against `getMe`. Called once at startup; a failure
    /// here is fatal.
    pub async fn authenticate(&self) -> Result<User> {
        let url = format!("{}/getMe", self.base_url);
        let response: ApiResponse<User> = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .context("getMe request failed")?
            .json()
            .await
            .context("failed to decode getMe response")?;

        unwrap_api(response, "getMe")
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let response: ApiResponse<Vec<Update>> = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", LONG_POLL_SECS.to_string()),
            ])
            .send()
            .await
            .context("getUpdates request failed")?
            .json()
            .await
            .context("failed to decode getUpdates response")?;

        unwrap_api(response, "getUpdates")
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }

        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?
            .json()
            .await
            .context("failed to decode sendMessage response")?;

        unwrap_api(response, "sendMessage").map(|_| ())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text, None).await
    }

    async fn send_choice(
        &self,
        chat_id: i64,
        text: &str,
        choices: &[(String, String)],
    ) -> Result<()> {
        let row = choices
            .iter()
            .map(|(label, payload)| InlineKeyboardButton {
                text: label.clone(),
                callback_data: payload.clone(),
            })
            .collect();
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![row],
        };
        self.send_message(chat_id, text, Some(markup)).await
    }
}

fn unwrap_api<T>(response: ApiResponse<T>, method: &str) -> Result<T> {
    if !response.ok {
        let description = response
            .description
            .unwrap_or_else(|| "no description".to_string());
        return Err(anyhow!("{method} rejected by Telegram: {description}"));
    }
    response
        .result
        .ok_or_else(|| anyhow!("{method} returned ok without a result"))
}
