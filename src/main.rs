//! tasktrack-bot - HTTP Server Entry Point
//!
//! Registers the Telegram webhook and serves the bot and inbox endpoints.

use tasktrack_bot::{api, config::Config};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasktrack_bot=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: store={:?}, public_url={}",
        config.store.store_type, config.public_url
    );
    if config.inbox_secret.is_none() {
        warn!("INBOX_SECRET is not set; /inbox will reject every request");
    }
    if config.default_chat_id.is_none() {
        info!("DEFAULT_CHAT_ID is not set; inbox requests must carry chat_id");
    }

    // Start HTTP server
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    api::serve(config).await?;

    Ok(())
}
