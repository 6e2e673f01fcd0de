//! `POST /inbox`: create a task from an external system.
//!
//! Body: `{"text": "...", "chat_id": 123, "customer": "...", "phone": "..."}`.
//! `chat_id` may be a number or a numeric string; when absent, `null` or `0`
//! it falls back to `DEFAULT_CHAT_ID`, any other value is rejected. `name` is
//! accepted in place of `customer`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::auth;
use super::routes::AppState;
use super::types::{ErrorResponse, InboxResponse};
use crate::bot::PostError;
use crate::task::make_inbox_title;
use crate::task_store::StoreError;
use crate::telegram::TelegramError;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("missing or wrong X-Secret")]
    Unauthorized,

    #[error("body is not a JSON object")]
    InvalidJson,

    #[error("text is required")]
    TextRequired,

    #[error("no chat_id given and DEFAULT_CHAT_ID unset")]
    ChatIdRequired,

    #[error("chat_id is not an integer: {0}")]
    InvalidChatId(String),

    #[error("sending task message failed: {0}")]
    SendFailed(#[from] TelegramError),

    #[error("storing task failed: {0}")]
    Store(#[from] StoreError),
}

impl InboxError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidJson => "invalid_json",
            Self::TextRequired => "text_required",
            Self::ChatIdRequired => "chat_id_required",
            Self::InvalidChatId(_) => "invalid_chat_id",
            Self::SendFailed(_) => "send_failed",
            Self::Store(_) => "store_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidJson
            | Self::TextRequired
            | Self::ChatIdRequired
            | Self::InvalidChatId(_) => StatusCode::BAD_REQUEST,
            Self::SendFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PostError> for InboxError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Send(e) => Self::SendFailed(e),
            PostError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for InboxError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            ok: false,
            error: self.code().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Chat id from a JSON integer or integer string.
///
/// `Ok(None)` when absent, `null`, blank or zero. Any other non-integer is
/// `InvalidChatId`.
fn parse_chat_id(value: Option<&serde_json::Value>) -> Result<Option<i64>, InboxError> {
    let invalid = |v: &serde_json::Value| InboxError::InvalidChatId(v.to_string());
    let id = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(v @ serde_json::Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(v))?,
        Some(v @ serde_json::Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse().map_err(|_| invalid(v))?
        }
        Some(other) => return Err(invalid(other)),
    };
    Ok(Some(id).filter(|id| *id != 0))
}

fn string_field<'a>(body: &'a serde_json::Map<String, serde_json::Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| body.get(*name).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub async fn inbox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InboxResponse>, InboxError> {
    if !auth::inbox_authorized(&headers, state.config.inbox_secret.as_deref()) {
        tracing::warn!("Rejected inbox request with missing or wrong secret");
        return Err(InboxError::Unauthorized);
    }

    let body: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&body).map_err(|_| InboxError::InvalidJson)?;

    let text = string_field(&body, &["text"]).ok_or(InboxError::TextRequired)?;
    let chat_id = parse_chat_id(body.get("chat_id"))?
        .or(state.config.default_chat_id)
        .ok_or(InboxError::ChatIdRequired)?;

    let title = make_inbox_title(
        text,
        string_field(&body, &["customer", "name"]),
        string_field(&body, &["phone"]),
        || state.bot.clock().now_string(),
    );

    let record = state.bot.post_task(chat_id, &title).await.map_err(|e| {
        let e = InboxError::from(e);
        tracing::error!("Inbox task for chat {} failed: {}", chat_id, e);
        e
    })?;

    Ok(Json(InboxResponse {
        ok: true,
        message_id: record.message_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::tests::{body_json, state_with};
    use crate::task_store::testing::UnavailableStore;
    use crate::task_store::InMemoryTaskStore;
    use crate::task_store::TaskStore;
    use crate::telegram::fake::RecordingMessenger;
    use axum::http::HeaderValue;

    fn secret_headers(secret: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-Secret", HeaderValue::from_static(secret));
        headers
    }

    async fn call(state: Arc<AppState>, headers: HeaderMap, body: &str) -> Response {
        inbox(State(state), headers, Bytes::from(body.to_string()))
            .await
            .into_response()
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_without_side_effects() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(1));
        let state = state_with(store.clone(), messenger.clone(), &[("DEFAULT_CHAT_ID", "100")]);

        let resp = call(state.clone(), secret_headers("nope"), r#"{"text": "x"}"#).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"ok": false, "error": "unauthorized"})
        );

        let resp = call(state, HeaderMap::new(), r#"{"text": "x"}"#).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(messenger.calls().is_empty());
        assert!(store.list_by_chat(100).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn fails_closed_when_secret_unset() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(1));
        let state = crate::api::routes::tests::state_without_inbox_secret(store, messenger);
        let resp = call(state, secret_headers("anything"), r#"{"text": "x", "chat_id": 1}"#).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validation_errors() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(1));
        let state = state_with(store.clone(), messenger.clone(), &[]);

        for (body, code) in [
            ("not json", "invalid_json"),
            ("[1, 2]", "invalid_json"),
            (r#"{"text": "   ", "chat_id": 100}"#, "text_required"),
            (r#"{"chat_id": 100}"#, "text_required"),
            (r#"{"text": "Buy milk"}"#, "chat_id_required"),
            (r#"{"text": "Buy milk", "chat_id": 0}"#, "chat_id_required"),
            (r#"{"text": "Buy milk", "chat_id": "-100abc"}"#, "invalid_chat_id"),
            (r#"{"text": "Buy milk", "chat_id": 1.5}"#, "invalid_chat_id"),
            (r#"{"text": "Buy milk", "chat_id": true}"#, "invalid_chat_id"),
        ] {
            let resp = call(state.clone(), secret_headers("s3cret"), body).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(body_json(resp).await["error"], code, "{}", body);
        }
        assert!(messenger.calls().is_empty());
        assert!(store.list_by_chat(100).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn creates_task_with_inbox_title() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(77));
        let state = state_with(store.clone(), messenger.clone(), &[]);

        let resp = call(
            state,
            secret_headers("s3cret"),
            r#"{"text": "2x coffee", "chat_id": "-100500", "customer": "Ayşe", "phone": "+90 555"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"ok": true, "message_id": 77})
        );

        let record = store.find(-100500, 77).await.expect("stored");
        assert_eq!(
            record.title,
            "ORDER: 2x coffee · 👤 Ayşe · 📞 +90 555 — 14.10.2026 09:30"
        );
        assert!(!record.done);
    }

    #[tokio::test]
    async fn falls_back_to_default_chat() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(5));
        let state = state_with(store.clone(), messenger, &[("DEFAULT_CHAT_ID", "42")]);

        let resp = call(state, secret_headers("s3cret"), r#"{"text": "Order #12"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let record = store.find(42, 5).await.expect("stored");
        assert!(record.title.starts_with("Order #12 — "));
    }

    #[tokio::test]
    async fn send_failure_is_bad_gateway() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(1));
        messenger.fail_sends();
        let state = state_with(store.clone(), messenger, &[]);

        let resp = call(state, secret_headers("s3cret"), r#"{"text": "x", "chat_id": 9}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(resp).await["error"], "send_failed");
        assert!(store.list_by_chat(9).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_server_error() {
        let messenger = Arc::new(RecordingMessenger::new(1));
        let state = state_with(Arc::new(UnavailableStore), messenger, &[]);

        let resp = call(state, secret_headers("s3cret"), r#"{"text": "x", "chat_id": 9}"#).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "store_unavailable");
    }

    #[tokio::test]
    async fn malformed_chat_id_never_reaches_default_chat() {
        let store = Arc::new(InMemoryTaskStore::new());
        let messenger = Arc::new(RecordingMessenger::new(5));
        let state = state_with(store.clone(), messenger.clone(), &[("DEFAULT_CHAT_ID", "42")]);

        for chat_id in [r#""-100abc""#, "1.5", "true", "[1]", r#"{"id": 1}"#] {
            let body = format!(r#"{{"text": "x", "chat_id": {}}}"#, chat_id);
            let resp = call(state.clone(), secret_headers("s3cret"), &body).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(body_json(resp).await["error"], "invalid_chat_id", "{}", body);
        }
        assert!(messenger.calls().is_empty());
        assert!(store.list_by_chat(42).await.expect("list").is_empty());

        for chat_id in ["null", "0", r#""""#] {
            let body = format!(r#"{{"text": "x", "chat_id": {}}}"#, chat_id);
            let resp = call(state.clone(), secret_headers("s3cret"), &body).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", body);
        }
        assert_eq!(store.list_by_chat(42).await.expect("list").open.len(), 3);
    }

    #[test]
    fn chat_id_parsing() {
        let v = serde_json::json!({
            "a": 12, "b": " -34 ", "c": "x", "d": 0, "e": 1.5, "f": null, "g": "  ", "h": false
        });
        assert_eq!(parse_chat_id(v.get("a")).ok(), Some(Some(12)));
        assert_eq!(parse_chat_id(v.get("b")).ok(), Some(Some(-34)));
        assert!(matches!(parse_chat_id(v.get("c")), Err(InboxError::InvalidChatId(_))));
        assert_eq!(parse_chat_id(v.get("d")).ok(), Some(None));
        assert!(matches!(parse_chat_id(v.get("e")), Err(InboxError::InvalidChatId(_))));
        assert_eq!(parse_chat_id(v.get("f")).ok(), Some(None));
        assert_eq!(parse_chat_id(v.get("g")).ok(), Some(None));
        assert!(matches!(parse_chat_id(v.get("h")), Err(InboxError::InvalidChatId(_))));
        assert_eq!(parse_chat_id(None).ok(), Some(None));
    }
}
