//! Chat-facing command surface.
//!
//! [`Bot::handle_update`] turns one Telegram update into store operations
//! and replies. Failures are logged and answered here; nothing propagates
//! back to the webhook handler.

mod commands;

pub use commands::Command;

use std::sync::Arc;

use thiserror::Error;

use crate::task::{
    display_name, make_title, render_cleared, render_controls, render_list, render_text,
    CallbackPayload, Clock, TaskRecord,
};
use crate::task_store::{StoreError, TaskStore};
use crate::telegram::{CallbackQuery, Message, Messenger, TelegramError, Update};

const HELP_TEXT: &str = "<b>Task tracker</b>\n\
/task &lt;text&gt; - add a task (alias /gorev)\n\
/list - show open and completed tasks\n\
/clear - remove completed tasks\n\
\n\
Press <b>✅ Done</b> under a task to complete it.";

const TASK_USAGE: &str = "Usage: /task &lt;text&gt;";
const SAVE_FAILED: &str = "⚠️ Could not save the task. Please try again.";
const STORE_FAILED: &str = "⚠️ Task list is unavailable right now. Please try again later.";

/// Failure while posting a new task message.
#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Send(#[from] TelegramError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Bot {
    store: Arc<dyn TaskStore>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    /// Our own username, used to ignore `/cmd@otherbot`
    username: Option<String>,
}

impl Bot {
    pub fn new(store: Arc<dyn TaskStore>, messenger: Arc<dyn Messenger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            messenger,
            clock,
            username: None,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    /// Post an open task message to `chat_id` and record it.
    ///
    /// The message goes out with placeholder controls first, since its id
    /// is only known after sending; the controls are then patched with the
    /// real id. A failed patch is logged and the task is still recorded.
    pub async fn post_task(&self, chat_id: i64, title: &str) -> Result<TaskRecord, PostError> {
        let text = render_text(title, false, None, None);
        let placeholder = render_controls(false, chat_id, 0);
        let message_id = self
            .messenger
            .send_message(chat_id, &text, Some(&placeholder))
            .await?;

        let record = TaskRecord::open(chat_id, message_id, title);
        if let Err(e) = self
            .messenger
            .edit_reply_markup(chat_id, message_id, &record.controls())
            .await
        {
            tracing::warn!("Failed to attach controls to task {}: {}", record.key(), e);
        }

        self.store.insert(record.clone()).await?;
        tracing::info!("Created task {} in {} store", record.key(), self.store.kind());
        Ok(record)
    }

    async fn handle_message(&self, message: Message) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = Command::parse(text, self.username.as_deref()) else {
            return;
        };
        let chat_id = message.chat.id;
        tracing::debug!("Command {:?} in chat {}", command, chat_id);

        match command {
            Command::Start | Command::Help => self.reply(chat_id, HELP_TEXT).await,
            Command::Task(raw) => self.create_task(chat_id, &raw).await,
            Command::List => self.list_tasks(chat_id).await,
            Command::Clear => self.clear_tasks(chat_id).await,
        }
    }

    async fn create_task(&self, chat_id: i64, raw: &str) {
        if raw.trim().is_empty() {
            self.reply(chat_id, TASK_USAGE).await;
            return;
        }
        let title = make_title(raw, || self.clock.now_string());
        match self.post_task(chat_id, &title).await {
            Ok(_) => {}
            Err(PostError::Send(e)) => {
                tracing::error!("Failed to send task message to chat {}: {}", chat_id, e);
            }
            Err(PostError::Store(e)) => {
                tracing::error!("Failed to store task for chat {}: {}", chat_id, e);
                self.reply(chat_id, SAVE_FAILED).await;
            }
        }
    }

    async fn list_tasks(&self, chat_id: i64) {
        match self.store.list_by_chat(chat_id).await {
            Ok(tasks) => self.reply(chat_id, &render_list(&tasks)).await,
            Err(e) => {
                tracing::error!("Failed to list tasks for chat {}: {}", chat_id, e);
                self.reply(chat_id, STORE_FAILED).await;
            }
        }
    }

    async fn clear_tasks(&self, chat_id: i64) {
        match self.store.clear_completed(chat_id).await {
            Ok(removed) => {
                tracing::info!("Cleared {} completed tasks in chat {}", removed, chat_id);
                self.reply(chat_id, &render_cleared(removed)).await;
            }
            Err(e) => {
                tracing::error!("Failed to clear tasks for chat {}: {}", chat_id, e);
                self.reply(chat_id, STORE_FAILED).await;
            }
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        // Always acknowledge so the client stops its loading indicator.
        if let Err(e) = self.messenger.answer_callback_query(&query.id).await {
            tracing::warn!("Failed to answer callback query {}: {}", query.id, e);
        }

        let Some(data) = query.data.as_deref() else {
            return;
        };
        let (chat_id, message_id) = match CallbackPayload::parse(data) {
            Ok(CallbackPayload::MarkDone {
                chat_id,
                message_id,
            }) => (chat_id, message_id),
            Ok(CallbackPayload::Noop) => return,
            Err(e) => {
                tracing::debug!("Ignoring callback payload {:?}: {}", data, e);
                return;
            }
        };

        let by = display_name(&query.from);
        let ts = self.clock.now_string();
        let record = match self.store.mark_done(chat_id, message_id, &by, &ts).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                tracing::debug!("Ignoring stale button for {}:{}", chat_id, message_id);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to complete task {}:{}: {}", chat_id, message_id, e);
                return;
            }
        };

        match self
            .messenger
            .edit_message_text(
                record.chat_id,
                record.message_id,
                &record.text(),
                Some(&record.controls()),
            )
            .await
        {
            Ok(()) => tracing::info!("Task {} completed by {}", record.key(), by),
            Err(e) if e.is_not_modified() => {
                tracing::debug!("Task {} message already shows completion", record.key());
            }
            Err(e) => tracing::warn!("Failed to update task message {}: {}", record.key(), e),
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messenger.send_message(chat_id, text, None).await {
            tracing::warn!("Failed to reply in chat {}: {}", chat_id, e);
        }
    }
}
