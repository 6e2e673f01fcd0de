//! Task storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: one JSON object file keyed by `chat_id:message_id`
//! - `sheets`: a Google Sheets worksheet used as a table
//!
//! Every backend runs its read-modify-write sections behind a single mutex,
//! so handlers in this process never lose each other's updates. Nothing
//! protects against a second process writing the same file or sheet.

mod file;
mod memory;
mod sheets;
#[cfg(test)]
pub(crate) mod testing;

pub use file::FileTaskStore;
pub use memory::InMemoryTaskStore;
pub use sheets::{SheetSchema, SheetsTaskStore, OPTIONAL_COLUMNS, REQUIRED_COLUMNS};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::google::{GoogleError, GoogleSheetsClient, ServiceAccountKey, TokenProvider, SHEETS_SCOPE};
use crate::task::{ChatTasks, Clock, TaskRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {chat_id}:{message_id} not found")]
    NotFound { chat_id: i64, message_id: i64 },

    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("task store misconfigured: {0}")]
    Config(String),

    #[error("task sheet schema error: {0}")]
    Schema(String),

    #[error("task store data is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(chat_id: i64, message_id: i64) -> Self {
        Self::NotFound {
            chat_id,
            message_id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<GoogleError> for StoreError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Credentials(msg) => Self::Config(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Short backend name for logs and the health endpoint.
    fn kind(&self) -> &'static str;

    /// Add a record. A record already stored under the same key is replaced.
    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError>;

    async fn find(&self, chat_id: i64, message_id: i64) -> Result<TaskRecord, StoreError>;

    /// Records of one chat split into open and done, insertion order kept.
    async fn list_by_chat(&self, chat_id: i64) -> Result<ChatTasks, StoreError>;

    /// Complete a task and return the stored record.
    ///
    /// Completing an already-done task succeeds without changing it.
    async fn mark_done(
        &self,
        chat_id: i64,
        message_id: i64,
        by: &str,
        ts: &str,
    ) -> Result<TaskRecord, StoreError>;

    /// Remove the chat's done records; returns how many were removed.
    async fn clear_completed(&self, chat_id: i64) -> Result<usize, StoreError>;
}

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStoreType {
    Memory,
    File,
    Sheets,
}

impl FromStr for TaskStoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "sheets" | "sheet" | "gsheet" | "google" => Ok(Self::Sheets),
            other => Err(format!("unknown task store type: {}", other)),
        }
    }
}

/// Create a task store based on configuration.
pub async fn create_task_store(
    config: &StoreConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn TaskStore>, StoreError> {
    match config.store_type {
        TaskStoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreType::File => {
            let store = FileTaskStore::new(config.data_file.clone()).await?;
            Ok(Arc::new(store))
        }
        TaskStoreType::Sheets => {
            let sheets = config.sheets.as_ref().ok_or_else(|| {
                StoreError::Config("GSHEET_ID and Google credentials are required".to_string())
            })?;
            let key = ServiceAccountKey::load(&sheets.credentials).await?;
            tracing::info!(
                "Using Google Sheets store {} (worksheet {}) as {}",
                sheets.spreadsheet_id,
                sheets.worksheet,
                key.client_email
            );
            let tokens = Arc::new(TokenProvider::new(reqwest::Client::new(), key, SHEETS_SCOPE));
            let api = GoogleSheetsClient::new(tokens, &sheets.spreadsheet_id);
            Ok(Arc::new(SheetsTaskStore::new(
                Box::new(api),
                &sheets.worksheet,
                clock,
            )))
        }
    }
}
