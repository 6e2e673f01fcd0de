//! Store doubles for handler tests.

use async_trait::async_trait;

use super::{StoreError, TaskStore};
use crate::task::{ChatTasks, TaskRecord};

/// Store whose every operation fails as if the backend were unreachable.
pub struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("backend unreachable".to_string())
}

#[async_trait]
impl TaskStore for UnavailableStore {
    fn is_persistent(&self) -> bool {
        false
    }

    fn kind(&self) -> &'static str {
        "unavailable"
    }

    async fn insert(&self, _record: TaskRecord) -> Result<(), StoreError> {
        Err(down())
    }

    async fn find(&self, _chat_id: i64, _message_id: i64) -> Result<TaskRecord, StoreError> {
        Err(down())
    }

    async fn list_by_chat(&self, _chat_id: i64) -> Result<ChatTasks, StoreError> {
        Err(down())
    }

    async fn mark_done(
        &self,
        _chat_id: i64,
        _message_id: i64,
        _by: &str,
        _ts: &str,
    ) -> Result<TaskRecord, StoreError> {
        Err(down())
    }

    async fn clear_completed(&self, _chat_id: i64) -> Result<usize, StoreError> {
        Err(down())
    }
}
