//! Google Sheets-backed task store.
//!
//! The worksheet's first row is a header; columns are located by header name
//! on every access, so users may reorder them or add their own. Data row `i`
//! (0-based) lives on sheet row `i + 2`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StoreError, TaskStore};
use crate::google::SheetsApi;
use crate::task::{ChatTasks, Clock, TaskRecord};

/// Header names the store cannot work without, in default column order.
pub const REQUIRED_COLUMNS: [&str; 6] = ["chat_id", "message_id", "task", "done", "by", "ts"];

/// Header names written for new worksheets but not required to exist.
pub const OPTIONAL_COLUMNS: [&str; 4] = ["owner", "due", "prio", "created"];

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn parse_done(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "done" | "✅"
    )
}

fn non_empty(raw: Option<&String>) -> Option<String> {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSchema {
    header: Vec<String>,
    chat_id: usize,
    message_id: usize,
    task: usize,
    done: usize,
    by: usize,
    ts: usize,
    created: Option<usize>,
}

impl SheetSchema {
    /// Header row for a freshly created worksheet.
    pub fn default_header() -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .chain(OPTIONAL_COLUMNS.iter())
            .map(|s| s.to_string())
            .collect()
    }

    /// Resolve column positions, failing if any required header is missing.
    pub fn from_header(header: &[String]) -> Result<Self, StoreError> {
        let names: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let position = |name: &str| names.iter().position(|h| h == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| position(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::Schema(format!(
                "worksheet header is missing column(s): {}",
                missing.join(", ")
            )));
        }

        // Every required position was checked above.
        let required = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            chat_id: required("chat_id"),
            message_id: required("message_id"),
            task: required("task"),
            done: required("done"),
            by: required("by"),
            ts: required("ts"),
            created: position("created"),
            header: header.to_vec(),
        })
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Decode a data row; `None` when the key cells are not integers.
    pub fn decode(&self, row: &[String]) -> Option<TaskRecord> {
        let cell = |idx: usize| row.get(idx);
        let chat_id = cell(self.chat_id)?.trim().parse().ok()?;
        let message_id = cell(self.message_id)?.trim().parse().ok()?;
        let done = cell(self.done).map(|s| parse_done(s)).unwrap_or(false);
        Some(TaskRecord::restore(
            chat_id,
            message_id,
            cell(self.task).cloned().unwrap_or_default(),
            done,
            non_empty(cell(self.by)),
            non_empty(cell(self.ts)),
        ))
    }

    /// Row cells for a new record.
    pub fn encode(&self, record: &TaskRecord, created: Option<&str>) -> Vec<String> {
        let mut row = Vec::new();
        self.write_record(&mut row, record, created);
        row
    }

    /// Overwrite the cells this store owns, keeping any others in `row`.
    ///
    /// `created` is only filled when the cell is still empty.
    pub fn write_record(&self, row: &mut Vec<String>, record: &TaskRecord, created: Option<&str>) {
        self.write_completion(row, record);
        row[self.chat_id] = record.chat_id.to_string();
        row[self.message_id] = record.message_id.to_string();
        row[self.task] = record.title.clone();
        if let (Some(idx), Some(created)) = (self.created, created) {
            if row[idx].trim().is_empty() {
                row[idx] = created.to_string();
            }
        }
    }

    /// Overwrite the done/by/ts cells of an existing row, keeping the rest.
    pub fn write_completion(&self, row: &mut Vec<String>, record: &TaskRecord) {
        if row.len() < self.width() {
            row.resize(self.width(), String::new());
        }
        row[self.done] = if record.done { "TRUE" } else { "FALSE" }.to_string();
        row[self.by] = record.by.clone().unwrap_or_default();
        row[self.ts] = record.ts.clone().unwrap_or_default();
    }

    /// Typed cell for writing with `valueInputOption=RAW`.
    pub fn cell_value(&self, col: usize, raw: &str) -> serde_json::Value {
        if col == self.chat_id || col == self.message_id {
            if let Ok(n) = raw.trim().parse::<i64>() {
                return serde_json::json!(n);
            }
        }
        if col == self.done && !raw.trim().is_empty() {
            return serde_json::json!(parse_done(raw));
        }
        serde_json::json!(raw)
    }

    pub fn typed_row(&self, row: &[String]) -> Vec<serde_json::Value> {
        row.iter()
            .enumerate()
            .map(|(col, raw)| self.cell_value(col, raw))
            .collect()
    }
}

/// Header plus data rows as read from the sheet.
struct Table {
    schema: SheetSchema,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn position(&self, chat_id: i64, message_id: i64) -> Option<(usize, TaskRecord)> {
        self.rows.iter().enumerate().find_map(|(i, row)| {
            self.schema
                .decode(row)
                .filter(|r| r.chat_id == chat_id && r.message_id == message_id)
                .map(|r| (i, r))
        })
    }

    fn records(&self) -> Vec<TaskRecord> {
        self.rows
            .iter()
            .filter_map(|row| self.schema.decode(row))
            .collect()
    }
}

pub struct SheetsTaskStore {
    api: Box<dyn SheetsApi>,
    worksheet: String,
    clock: Arc<dyn Clock>,
    /// Serializes all sheet access; the flag records that the worksheet exists.
    ready: Mutex<bool>,
}

impl SheetsTaskStore {
    pub fn new(api: Box<dyn SheetsApi>, worksheet: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            worksheet: worksheet.to_string(),
            clock,
            ready: Mutex::new(false),
        }
    }

    fn quoted_title(&self) -> String {
        format!("'{}'", self.worksheet.replace('\'', "''"))
    }

    fn all_range(&self) -> String {
        format!("{}!A1:ZZ", self.quoted_title())
    }

    fn row_range(&self, sheet_row: usize) -> String {
        format!("{}!A{}", self.quoted_title(), sheet_row)
    }

    async fn ensure_worksheet(&self, ready: &mut bool) -> Result<(), StoreError> {
        if *ready {
            return Ok(());
        }
        let titles = self.api.worksheet_titles().await?;
        if !titles.iter().any(|t| t == &self.worksheet) {
            tracing::info!("Creating worksheet {:?}", self.worksheet);
            self.api.add_worksheet(&self.worksheet).await?;
        }
        *ready = true;
        Ok(())
    }

    /// Read the whole table, writing the default header into an empty sheet.
    async fn read_table(&self, ready: &mut bool) -> Result<Table, StoreError> {
        self.ensure_worksheet(ready).await?;
        let mut values = self.api.get_values(&self.all_range()).await?;

        let header_blank = values
            .first()
            .map(|h| h.iter().all(|c| c.trim().is_empty()))
            .unwrap_or(true);
        if header_blank && values.iter().skip(1).all(|r| r.is_empty()) {
            let header = SheetSchema::default_header();
            let row: Vec<serde_json::Value> = header.iter().map(|h| serde_json::json!(h)).collect();
            self.api.update_values(&self.row_range(1), vec![row]).await?;
            return Ok(Table {
                schema: SheetSchema::from_header(&header)?,
                rows: Vec::new(),
            });
        }

        let rows = values.split_off(1);
        let schema = SheetSchema::from_header(&values[0])?;
        Ok(Table { schema, rows })
    }
}

#[async_trait]
impl TaskStore for SheetsTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "sheets"
    }

    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut ready = self.ready.lock().await;
        let table = self.read_table(&mut ready).await?;
        let created = self.clock.now_string();

        match table.position(record.chat_id, record.message_id) {
            Some((i, _)) => {
                let mut row = table.rows[i].clone();
                table.schema.write_record(&mut row, &record, Some(&created));
                self.api
                    .update_values(&self.row_range(i + 2), vec![table.schema.typed_row(&row)])
                    .await?;
            }
            None => {
                let row = table.schema.encode(&record, Some(&created));
                self.api
                    .append_row(&self.row_range(1), table.schema.typed_row(&row))
                    .await?;
            }
        }
        Ok(())
    }

    async fn find(&self, chat_id: i64, message_id: i64) -> Result<TaskRecord, StoreError> {
        let mut ready = self.ready.lock().await;
        let table = self.read_table(&mut ready).await?;
        table
            .position(chat_id, message_id)
            .map(|(_, r)| r)
            .ok_or_else(|| StoreError::not_found(chat_id, message_id))
    }

    async fn list_by_chat(&self, chat_id: i64) -> Result<ChatTasks, StoreError> {
        let mut ready = self.ready.lock().await;
        let table = self.read_table(&mut ready).await?;
        let records = table.records();
        Ok(ChatTasks::partition(chat_id, records.iter()))
    }

    async fn mark_done(
        &self,
        chat_id: i64,
        message_id: i64,
        by: &str,
        ts: &str,
    ) -> Result<TaskRecord, StoreError> {
        let mut ready = self.ready.lock().await;
        let table = self.read_table(&mut ready).await?;
        let (i, mut record) = table
            .position(chat_id, message_id)
            .ok_or_else(|| StoreError::not_found(chat_id, message_id))?;

        if !record.complete(by, ts) {
            return Ok(record);
        }

        let mut row = table.rows[i].clone();
        table.schema.write_completion(&mut row, &record);
        self.api
            .update_values(&self.row_range(i + 2), vec![table.schema.typed_row(&row)])
            .await?;
        Ok(record)
    }

    async fn clear_completed(&self, chat_id: i64) -> Result<usize, StoreError> {
        let mut ready = self.ready.lock().await;
        let table = self.read_table(&mut ready).await?;

        let (removed, kept): (Vec<_>, Vec<_>) = table.rows.iter().partition(|row| {
            table
                .schema
                .decode(row)
                .map(|r| r.chat_id == chat_id && r.done)
                .unwrap_or(false)
        });
        if removed.is_empty() {
            return Ok(0);
        }

        // One write covering every old cell: kept rows move up and the
        // vacated tail is blanked. A failed write leaves the sheet as it was.
        let width = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.schema.width()))
            .max()
            .unwrap_or_default();
        let pad = |cells: Vec<serde_json::Value>| {
            let mut cells = cells;
            cells.resize(width, serde_json::json!(""));
            cells
        };

        let mut out: Vec<Vec<serde_json::Value>> = Vec::with_capacity(table.rows.len() + 1);
        let header: Vec<serde_json::Value> =
            table.schema.header.iter().map(|h| serde_json::json!(h)).collect();
        out.push(pad(header));
        out.extend(kept.iter().map(|row| pad(table.schema.typed_row(row))));
        out.resize(table.rows.len() + 1, vec![serde_json::json!(""); width]);

        self.api.update_values(&self.row_range(1), out).await?;
        tracing::debug!("Rewrote worksheet after clearing {} tasks", removed.len());
        Ok(removed.len())
    }
}
