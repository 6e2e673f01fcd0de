//! Recording [`Messenger`] for tests.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Messenger, TelegramError};
use crate::task::Controls;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: i64,
        text: String,
        controls: Option<Controls>,
    },
    EditText {
        chat_id: i64,
        message_id: i64,
        text: String,
        controls: Option<Controls>,
    },
    EditMarkup {
        chat_id: i64,
        message_id: i64,
        controls: Controls,
    },
    Answer(String),
}

pub struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI64,
    fail_send: AtomicBool,
    fail_edit: AtomicBool,
}

impl RecordingMessenger {
    /// Sent messages get ids starting at `first_message_id`.
    pub fn new(first_message_id: i64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(first_message_id),
            fail_send: AtomicBool::new(false),
            fail_edit: AtomicBool::new(false),
        }
    }

    pub fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    pub fn fail_edits(&self) {
        self.fail_edit.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of every `sendMessage`, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn api_error(method: &'static str) -> TelegramError {
        TelegramError::Api {
            method,
            description: "Bad Request: chat not found".to_string(),
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<i64, TelegramError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Self::api_error("sendMessage"));
        }
        self.record(Call::Send {
            chat_id,
            text: text.to_string(),
            controls: controls.cloned(),
        });
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<(), TelegramError> {
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(Self::api_error("editMessageText"));
        }
        self.record(Call::EditText {
            chat_id,
            message_id,
            text: text.to_string(),
            controls: controls.cloned(),
        });
        Ok(())
    }

    async fn edit_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        controls: &Controls,
    ) -> Result<(), TelegramError> {
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(Self::api_error("editMessageReplyMarkup"));
        }
        self.record(Call::EditMarkup {
            chat_id,
            message_id,
            controls: controls.clone(),
        });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        self.record(Call::Answer(callback_query_id.to_string()));
        Ok(())
    }
}
