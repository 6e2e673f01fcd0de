//! Task records and the pure lifecycle logic around them.
//!
//! Nothing in this module touches the network or the disk: stores persist
//! [`TaskRecord`]s, the bot and the inbox turn them into Telegram messages
//! using the helpers re-exported here.

mod clock;
mod payload;
mod render;
mod title;

pub use clock::{Clock, FixedClock, SystemClock, TIMESTAMP_FORMAT};
pub use payload::{CallbackPayload, PayloadError, MAX_CALLBACK_DATA_LEN};
pub use render::{
    escape_html, render_cleared, render_controls, render_list, render_text, Button, Controls,
};
pub use title::{display_name, make_inbox_title, make_title, INBOX_KEYWORDS, INBOX_PREFIX};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a task: the chat it lives in and the message that renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub chat_id: i64,
    pub message_id: i64,
}

impl TaskKey {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }

    /// Parse the `"{chat_id}:{message_id}"` form used by the JSON file store.
    ///
    /// Only the canonical spelling produced by `Display` is accepted, so
    /// `" 1:2"` or `"01:2"` never alias the key `"1:2"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (chat, message) = raw.split_once(':')?;
        let key = Self::new(chat.parse().ok()?, message.parse().ok()?);
        (key.to_string() == raw).then_some(key)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.message_id)
    }
}

/// Stand-in for a completer or completion time that storage lost.
pub const UNKNOWN_COMPLETION: &str = "?";

/// Persisted state of a single task.
///
/// # Invariants
/// - `done == true` iff `by` and `ts` are both `Some`
/// - `done` never goes back to `false`
/// - `title` is never modified after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub chat_id: i64,
    pub message_id: i64,
    pub title: String,
    pub done: bool,
    pub by: Option<String>,
    pub ts: Option<String>,
}

impl TaskRecord {
    /// Create an open task.
    pub fn open(chat_id: i64, message_id: i64, title: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            title: title.into(),
            done: false,
            by: None,
            ts: None,
        }
    }

    /// Rebuild a record from persisted fields, restoring the completion
    /// invariant: a done record missing `by`/`ts` gets [`UNKNOWN_COMPLETION`],
    /// an open record drops any stray `by`/`ts`.
    pub fn restore(
        chat_id: i64,
        message_id: i64,
        title: String,
        done: bool,
        by: Option<String>,
        ts: Option<String>,
    ) -> Self {
        let filled = |value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_COMPLETION.to_string())
        };
        let (by, ts) = if done {
            (Some(filled(by)), Some(filled(ts)))
        } else {
            (None, None)
        };
        Self {
            chat_id,
            message_id,
            title,
            done,
            by,
            ts,
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.chat_id, self.message_id)
    }

    /// Mark the task completed.
    ///
    /// Returns `false` and leaves the record untouched if it was already done,
    /// so the first completer's name and time are the ones that stick.
    pub fn complete(&mut self, by: &str, ts: &str) -> bool {
        if self.done {
            return false;
        }
        self.done = true;
        self.by = Some(by.to_string());
        self.ts = Some(ts.to_string());
        true
    }

    /// Rendered message body for this record.
    pub fn text(&self) -> String {
        render_text(
            &self.title,
            self.done,
            self.by.as_deref(),
            self.ts.as_deref(),
        )
    }

    /// Inline controls for this record.
    pub fn controls(&self) -> Controls {
        render_controls(self.done, self.chat_id, self.message_id)
    }
}

/// Tasks of one chat split by completion, insertion order kept in each half.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTasks {
    pub open: Vec<TaskRecord>,
    pub done: Vec<TaskRecord>,
}

impl ChatTasks {
    /// Partition `records` (in insertion order) for `chat_id`.
    pub fn partition<'a, I>(chat_id: i64, records: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskRecord>,
    {
        let mut tasks = Self::default();
        for record in records.into_iter().filter(|r| r.chat_id == chat_id) {
            if record.done {
                tasks.done.push(record.clone());
            } else {
                tasks.open.push(record.clone());
            }
        }
        tasks
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.done.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_display() {
        let key = TaskKey::new(-100123, 42);
        assert_eq!(key.to_string(), "-100123:42");
        assert_eq!(TaskKey::parse("-100123:42"), Some(key));
    }

    #[test]
    fn key_parse_rejects_garbage() {
        assert_eq!(TaskKey::parse("100"), None);
        assert_eq!(TaskKey::parse("abc:1"), None);
        assert_eq!(TaskKey::parse("1:x"), None);
    }

    #[test]
    fn key_parse_accepts_only_canonical_form() {
        for alias in [" 1:2", "1: 2", "01:2", "+1:2", "1:02", "-0:2"] {
            assert_eq!(TaskKey::parse(alias), None, "{:?}", alias);
        }
        assert_eq!(TaskKey::parse("0:2"), Some(TaskKey::new(0, 2)));
    }

    #[test]
    fn restore_upholds_completion_invariant() {
        let done = TaskRecord::restore(1, 2, "t".to_string(), true, None, Some(" ".to_string()));
        assert_eq!(done.by.as_deref(), Some(UNKNOWN_COMPLETION));
        assert_eq!(done.ts.as_deref(), Some(UNKNOWN_COMPLETION));

        let kept = TaskRecord::restore(1, 2, "t".to_string(), true, Some("Alice".to_string()), Some("x".to_string()));
        assert_eq!(kept.by.as_deref(), Some("Alice"));

        let open = TaskRecord::restore(1, 2, "t".to_string(), false, Some("Alice".to_string()), None);
        assert_eq!(open, TaskRecord::open(1, 2, "t"));
    }

    #[test]
    fn complete_sets_fields_once() {
        let mut record = TaskRecord::open(1, 2, "Buy milk");
        assert!(record.complete("Alice", "01.02.2026 10:00"));
        assert!(record.done);
        assert_eq!(record.by.as_deref(), Some("Alice"));

        assert!(!record.complete("Bob", "01.02.2026 11:00"));
        assert_eq!(record.by.as_deref(), Some("Alice"));
        assert_eq!(record.ts.as_deref(), Some("01.02.2026 10:00"));
    }

    #[test]
    fn partition_filters_chat_and_keeps_order() {
        let mut done = TaskRecord::open(100, 3, "c");
        done.complete("Alice", "now");
        let records = vec![
            TaskRecord::open(100, 1, "a"),
            TaskRecord::open(200, 2, "other chat"),
            done,
            TaskRecord::open(100, 4, "d"),
        ];

        let tasks = ChatTasks::partition(100, &records);
        let open: Vec<_> = tasks.open.iter().map(|r| r.title.as_str()).collect();
        let done: Vec<_> = tasks.done.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(open, vec!["a", "d"]);
        assert_eq!(done, vec!["c"]);
    }
}
