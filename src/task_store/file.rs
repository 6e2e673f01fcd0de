//! JSON file-based task store.
//!
//! The file is a single object mapping `"chat_id:message_id"` to
//! `{title, done, by, ts}`, with keys kept in insertion order. Each operation
//! re-reads the file and each mutation rewrites it through a temp file and a
//! rename, so edits made to the file while the bot runs are picked up.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use super::{StoreError, TaskStore};
use crate::task::{ChatTasks, TaskKey, TaskRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTask {
    title: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl StoredTask {
    fn into_record(self, key: TaskKey) -> TaskRecord {
        TaskRecord::restore(key.chat_id, key.message_id, self.title, self.done, self.by, self.ts)
    }
}

impl From<&TaskRecord> for StoredTask {
    fn from(record: &TaskRecord) -> Self {
        Self {
            title: record.title.clone(),
            done: record.done,
            by: record.by.clone(),
            ts: record.ts.clone(),
        }
    }
}

/// One entry of the file, in file order.
#[derive(Debug, Clone)]
enum Entry {
    Task(TaskRecord),
    /// Key or value we don't understand; written back verbatim.
    Foreign(String, serde_json::Value),
}

#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<Entry>,
}

impl Snapshot {
    fn tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Task(record) => Some(record),
            Entry::Foreign(..) => None,
        })
    }

    fn task_mut(&mut self, chat_id: i64, message_id: i64) -> Option<&mut TaskRecord> {
        self.entries.iter_mut().find_map(|e| match e {
            Entry::Task(record) if record.chat_id == chat_id && record.message_id == message_id => {
                Some(record)
            }
            _ => None,
        })
    }

    fn to_json(&self) -> Result<serde_json::Map<String, serde_json::Value>, StoreError> {
        let mut map = serde_json::Map::new();
        for entry in &self.entries {
            match entry {
                Entry::Task(record) => {
                    let value = serde_json::to_value(StoredTask::from(record))
                        .map_err(|e| StoreError::Unavailable(format!("Failed to serialize task: {}", e)))?;
                    map.insert(record.key().to_string(), value);
                }
                Entry::Foreign(key, value) => {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(map)
    }
}

pub struct FileTaskStore {
    path: PathBuf,
    op_lock: Mutex<()>,
}

impl FileTaskStore {
    pub async fn new(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("Failed to create task store dir: {}", e)))?;
        }
        let store = Self {
            path,
            op_lock: Mutex::new(()),
        };
        // Surface a corrupt file at startup rather than on the first command.
        let snapshot = store.load().await?;
        tracing::info!(
            "Using JSON task store {} ({} tasks)",
            store.path.display(),
            snapshot.tasks().count()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Snapshot, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot::default());
        }

        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        let mut entries = Vec::with_capacity(map.len());
        for (raw_key, value) in map {
            let parsed = TaskKey::parse(&raw_key)
                .and_then(|key| serde_json::from_value::<StoredTask>(value.clone()).ok().map(|t| (key, t)));
            match parsed {
                Some((key, task)) => entries.push(Entry::Task(task.into_record(key))),
                None => {
                    tracing::warn!("Ignoring unrecognised entry {:?} in {}", raw_key, self.path.display());
                    entries.push(Entry::Foreign(raw_key, value));
                }
            }
        }
        Ok(Snapshot { entries })
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(&snapshot.to_json()?)
            .map_err(|e| StoreError::Unavailable(format!("Failed to serialize task store: {}", e)))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to write task store: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to finalize task store: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "file"
    }

    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let _guard = self.op_lock.lock().await;
        let mut snapshot = self.load().await?;
        match snapshot.task_mut(record.chat_id, record.message_id) {
            Some(existing) => *existing = record,
            None => snapshot.entries.push(Entry::Task(record)),
        }
        self.persist(&snapshot).await
    }

    async fn find(&self, chat_id: i64, message_id: i64) -> Result<TaskRecord, StoreError> {
        let _guard = self.op_lock.lock().await;
        let snapshot = self.load().await?;
        let found = snapshot
            .tasks()
            .find(|r| r.chat_id == chat_id && r.message_id == message_id)
            .cloned();
        found.ok_or_else(|| StoreError::not_found(chat_id, message_id))
    }

    async fn list_by_chat(&self, chat_id: i64) -> Result<ChatTasks, StoreError> {
        let _guard = self.op_lock.lock().await;
        let snapshot = self.load().await?;
        Ok(ChatTasks::partition(chat_id, snapshot.tasks()))
    }

    async fn mark_done(
        &self,
        chat_id: i64,
        message_id: i64,
        by: &str,
        ts: &str,
    ) -> Result<TaskRecord, StoreError> {
        let _guard = self.op_lock.lock().await;
        let mut snapshot = self.load().await?;
        let record = snapshot
            .task_mut(chat_id, message_id)
            .ok_or_else(|| StoreError::not_found(chat_id, message_id))?;
        let changed = record.complete(by, ts);
        let record = record.clone();
        if changed {
            self.persist(&snapshot).await?;
        }
        Ok(record)
    }

    async fn clear_completed(&self, chat_id: i64) -> Result<usize, StoreError> {
        let _guard = self.op_lock.lock().await;
        let mut snapshot = self.load().await?;
        let before = snapshot.entries.len();
        snapshot.entries.retain(|e| match e {
            Entry::Task(record) => record.chat_id != chat_id || !record.done,
            Entry::Foreign(..) => true,
        });
        let removed = before - snapshot.entries.len();
        if removed > 0 {
            self.persist(&snapshot).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_store::tests::exercise_store_contract;

    #[tokio::test]
    async fn file_store_honours_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTaskStore::new(dir.path().join("tasks.json"))
            .await
            .expect("store");
        exercise_store_contract(&store).await;
    }

    #[tokio::test]
    async fn writes_original_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        let store = FileTaskStore::new(path.clone()).await.expect("store");
        store
            .insert(TaskRecord::open(-100, 9, "Buy milk"))
            .await
            .expect("insert");

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert_eq!(
            raw,
            serde_json::json!({
                "-100:9": {"title": "Buy milk", "done": false, "by": null, "ts": null}
            })
        );
    }

    #[tokio::test]
    async fn survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tasks.json");
        {
            let store = FileTaskStore::new(path.clone()).await.expect("store");
            store
                .insert(TaskRecord::open(1, 1, "first"))
                .await
                .expect("insert");
            store.mark_done(1, 1, "Alice", "now").await.expect("done");
        }
        let store = FileTaskStore::new(path).await.expect("reopen");
        let record = store.find(1, 1).await.expect("find");
        assert!(record.done);
        assert_eq!(record.by.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn insertion_order_survives_rewrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTaskStore::new(dir.path().join("tasks.json"))
            .await
            .expect("store");
        for id in [10, 9, 100, 2] {
            store
                .insert(TaskRecord::open(5, id, format!("task {}", id)))
                .await
                .expect("insert");
        }
        let ids: Vec<_> = store
            .list_by_chat(5)
            .await
            .expect("list")
            .open
            .iter()
            .map(|r| r.message_id)
            .collect();
        assert_eq!(ids, vec![10, 9, 100, 2]);
    }

    #[tokio::test]
    async fn keeps_unrecognised_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"{"legacy": {"note": "keep me"}, "7:1": {"title": "t", "done": true, "by": "A", "ts": "x"}}"#,
        )
        .expect("seed");

        let store = FileTaskStore::new(path.clone()).await.expect("store");
        assert_eq!(store.clear_completed(7).await.expect("clear"), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert_eq!(raw, serde_json::json!({"legacy": {"note": "keep me"}}));
    }

    #[tokio::test]
    async fn find_sees_external_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        let store = FileTaskStore::new(path.clone()).await.expect("store");
        assert!(store.find(3, 4).await.unwrap_err().is_not_found());

        std::fs::write(&path, r#"{"3:4": {"title": "added by hand", "done": true}}"#)
            .expect("edit");
        let record = store.find(3, 4).await.expect("find");
        assert_eq!(record.title, "added by hand");
        assert!(record.done);
        assert_eq!(record.by.as_deref(), Some(crate::task::UNKNOWN_COMPLETION));
    }

    #[tokio::test]
    async fn non_canonical_keys_do_not_duplicate_tasks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"{"1:2": {"title": "real"}, " 1:2": {"title": "spaced"}, "01:2": {"title": "padded"}}"#,
        )
        .expect("seed");

        let store = FileTaskStore::new(path.clone()).await.expect("store");
        let listed = store.list_by_chat(1).await.expect("list");
        assert_eq!(listed.open.len(), 1);
        assert_eq!(listed.open[0].title, "real");

        store.mark_done(1, 2, "Alice", "now").await.expect("done");
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        assert_eq!(raw[" 1:2"]["title"], "spaced");
        assert_eq!(raw["01:2"]["title"], "padded");
        assert_eq!(raw["1:2"]["by"], "Alice");
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{not json").expect("seed");
        match FileTaskStore::new(path).await {
            Err(StoreError::Corrupt(_)) => {}
            Err(other) => panic!("expected corrupt error, got {:?}", other),
            Ok(_) => panic!("expected corrupt error"),
        }
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = std::sync::Arc::new(
            FileTaskStore::new(dir.path().join("tasks.json"))
                .await
                .expect("store"),
        );
        let mut handles = Vec::new();
        for id in 0..20 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(TaskRecord::open(1, id, format!("task {}", id)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("insert");
        }
        assert_eq!(store.list_by_chat(1).await.expect("list").open.len(), 20);
    }
}
