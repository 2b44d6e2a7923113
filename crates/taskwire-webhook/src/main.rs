use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use taskwire_core::backend::RestBackend;
use taskwire_core::config::Settings;
use taskwire_webhook::{router, AppState, TelegramClient};

fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(format!(
        "warn,taskwire_webhook={log_level},taskwire_core={log_level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Settings::load().context("failed to load configuration")?;
    let bot_token = settings.require_bot_token()?;
    let backend = RestBackend::new(&settings.backend)?;
    let chat = TelegramClient::new(bot_token)?;

    let state = AppState {
        backend: Arc::new(backend),
        chat: Arc::new(chat),
        digest_owner: settings.owner.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "webhook server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
