//! # tasktrack-bot
//!
//! Telegram group task tracker.
//!
//! This library provides:
//! - A command surface (`/task`, `/list`, `/clear`) and a "done" button per task
//! - An authenticated HTTP inbox so other systems can post tasks
//! - Pluggable task storage: memory, a JSON file, or a Google Sheets worksheet
//!
//! ## Architecture
//!
//! ```text
//!   Telegram ──► POST /telegram ──┐
//!                                 ├──► Bot ──► TaskStore (memory | file | sheets)
//!   external ──► POST /inbox ─────┘     │
//!                                       └──► Messenger (Telegram Bot API)
//! ```
//!
//! ## Task Flow
//! 1. A command or inbox request names a chat and some text
//! 2. The task message is sent, then its button is bound to the message id
//! 3. The record is stored under `(chat_id, message_id)`
//! 4. Pressing the button completes the record and re-renders the message
//!
//! ## Modules
//! - `task`: records, titles, rendering, callback payloads
//! - `task_store`: storage backends
//! - `bot`: command and button handling
//! - `api`: HTTP endpoints
//! - `telegram`, `google`: outbound API clients

pub mod api;
pub mod bot;
pub mod config;
pub mod google;
pub mod task;
pub mod task_store;
pub mod telegram;

pub use config::Config;
pub use task::TaskRecord;
pub use task_store::{TaskStore, TaskStoreType};
