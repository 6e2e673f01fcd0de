//! In-memory task store (non-persistent).

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StoreError, TaskStore};
use crate::task::{ChatTasks, TaskRecord};

#[derive(Default)]
pub struct InMemoryTaskStore {
    records: Mutex<Vec<TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.key() == record.key()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn find(&self, chat_id: i64, message_id: i64) -> Result<TaskRecord, StoreError> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.chat_id == chat_id && r.message_id == message_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(chat_id, message_id))
    }

    async fn list_by_chat(&self, chat_id: i64) -> Result<ChatTasks, StoreError> {
        let records = self.records.lock().await;
        Ok(ChatTasks::partition(chat_id, records.iter()))
    }

    async fn mark_done(
        &self,
        chat_id: i64,
        message_id: i64,
        by: &str,
        ts: &str,
    ) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.chat_id == chat_id && r.message_id == message_id)
            .ok_or_else(|| StoreError::not_found(chat_id, message_id))?;
        record.complete(by, ts);
        Ok(record.clone())
    }

    async fn clear_completed(&self, chat_id: i64) -> Result<usize, StoreError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.chat_id != chat_id || !r.done);
        Ok(before - records.len())
    }
}
