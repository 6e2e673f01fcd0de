//! HTTP API for the task tracker.
//!
//! ## Endpoints
//!
//! - `POST /telegram` - Telegram webhook updates (commands and button presses)
//! - `POST /inbox` - Create a task from an external system (`X-Secret` required)
//! - `POST /webhook` - Alias of `/inbox`
//! - `GET /health` - Health check (also served at `/`)

mod auth;
mod inbox;
mod routes;
pub mod types;

pub use inbox::InboxError;
pub use routes::{router, serve, AppState};
pub use types::*;
