//! reqwest client for the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::{ApiResponse, SentMessage, User};
use super::{Messenger, TelegramError};
use crate::task::Controls;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_base: &str) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let res = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TelegramError::Network {
                method,
                // reqwest errors embed the URL, which contains the token.
                message: e.without_url().to_string(),
            })?;

        let parsed = res
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| TelegramError::Parse {
                method,
                message: e.without_url().to_string(),
            })?;

        if !parsed.ok {
            return Err(TelegramError::Api {
                method,
                description: parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        parsed.result.ok_or_else(|| TelegramError::Parse {
            method,
            message: "missing result".to_string(),
        })
    }

    /// Identity of the bot behind the token.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", serde_json::json!({})).await
    }

    /// Point Telegram at our update endpoint.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({
            "url": url,
            "drop_pending_updates": true,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = serde_json::json!(secret);
        }
        let _: bool = self.call("setWebhook", body).await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<i64, TelegramError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(controls) = controls {
            body["reply_markup"] = controls.to_reply_markup();
        }
        let sent: SentMessage = self.call("sendMessage", body).await?;
        Ok(sent.message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(controls) = controls {
            body["reply_markup"] = controls.to_reply_markup();
        }
        // Result is the edited Message (or `true` for inline messages).
        let _: serde_json::Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        controls: &Controls,
    ) -> Result<(), TelegramError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": controls.to_reply_markup(),
        });
        let _: serde_json::Value = self.call("editMessageReplyMarkup", body).await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let body = serde_json::json!({ "callback_query_id": callback_query_id });
        let _: bool = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }
}
