//! Response bodies of the HTTP API.

use serde::Serialize;

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Active task store backend (`memory`, `file`, `sheets`)
    pub store: String,

    /// Whether tasks survive a restart
    pub persistent: bool,
}

/// Successful inbox response
#[derive(Debug, Clone, Serialize)]
pub struct InboxResponse {
    pub ok: bool,

    /// Telegram message id of the posted task
    pub message_id: i64,
}

/// Failed inbox response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,

    /// Machine-readable error code
    pub error: String,
}
