//! Telegram Bot API collaborator.
//!
//! The bot and the inbox talk to Telegram only through the [`Messenger`]
//! trait; [`TelegramClient`] is the reqwest-backed implementation.

mod client;
#[cfg(test)]
pub(crate) mod fake;
mod types;

pub use client::{TelegramClient, DEFAULT_API_BASE_URL};
pub use types::{ApiResponse, CallbackQuery, Chat, Message, SentMessage, Update, User};

use async_trait::async_trait;
use thiserror::Error;

use crate::task::Controls;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram {method} request failed: {message}")]
    Network { method: &'static str, message: String },

    #[error("telegram {method} failed: {description}")]
    Api {
        method: &'static str,
        description: String,
    },

    #[error("telegram {method} response parse failed: {message}")]
    Parse { method: &'static str, message: String },
}

impl TelegramError {
    /// Telegram refuses edits that would leave a message unchanged.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

/// Outbound messaging operations used by the bot.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message; returns the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<i64, TelegramError>;

    /// Replace the text (and keyboard) of an existing message.
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<(), TelegramError>;

    /// Replace only the inline keyboard of an existing message.
    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        controls: &Controls,
    ) -> Result<(), TelegramError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError>;
}
