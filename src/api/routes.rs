//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::bot::Bot;
use crate::config::{Config, WEBHOOK_PATH};
use crate::task::{Clock, SystemClock};
use crate::task_store::{create_task_store, TaskStore};
use crate::telegram::{Messenger, TelegramClient, Update};

use super::auth;
use super::inbox;
use super::types::HealthResponse;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Command surface, also used by the inbox to post tasks
    pub bot: Bot,
    pub store: Arc<dyn TaskStore>,
}

/// Build the router over prepared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(telegram_webhook))
        .route("/inbox", post(inbox::inbox))
        .route("/webhook", post(inbox::inbox))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.tz_offset));

    let store = create_task_store(&config.store, Arc::clone(&clock)).await?;
    tracing::info!(
        "Task store: {} (persistent: {})",
        store.kind(),
        store.is_persistent()
    );
    if !store.is_persistent() {
        tracing::warn!("Tasks are kept in memory only and will be lost on restart");
    }

    let telegram = Arc::new(TelegramClient::new(&config.bot_token, &config.telegram_api_url));

    let username = match telegram.get_me().await {
        Ok(me) => {
            tracing::info!("Authorized as @{}", me.username.as_deref().unwrap_or("?"));
            me.username
        }
        Err(e) => {
            tracing::warn!("getMe failed, commands addressed to any bot will be accepted: {}", e);
            None
        }
    };

    let webhook_url = config.webhook_url();
    match telegram
        .set_webhook(&webhook_url, config.webhook_secret.as_deref())
        .await
    {
        Ok(()) => tracing::info!("Webhook registered at {}", webhook_url),
        Err(e) => tracing::error!("Failed to register webhook {}: {}", webhook_url, e),
    }

    let messenger: Arc<dyn Messenger> = telegram;
    let bot = Bot::new(Arc::clone(&store), messenger, clock).with_username(username);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, bot, store });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, finishing in-flight requests");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.kind().to_string(),
        persistent: state.store.is_persistent(),
    })
}

/// Telegram update endpoint.
///
/// Undecodable updates are acknowledged anyway so Telegram stops
/// redelivering them.
async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !auth::webhook_authorized(&headers, state.config.webhook_secret.as_deref()) {
        tracing::warn!("Rejected Telegram update with wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            tracing::debug!("Update {}", update.update_id);
            state.bot.handle_update(update).await;
        }
        Err(e) => tracing::warn!("Ignoring undecodable Telegram update: {}", e),
    }
    StatusCode::OK
}
