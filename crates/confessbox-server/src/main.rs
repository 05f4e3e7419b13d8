mod cleanup;
mod config;
mod telegram;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use confessbox_db::Database;
use confessbox_engine::SessionRouter;

use crate::config::Config;
use crate::telegram::TelegramClient;
use crate::webhook::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confessbox=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Resolve our own username; deep links are built from it
    let client = Arc::new(TelegramClient::new(&config.bot_token));
    let me = client.get_me().await.context("getMe failed, check CONFESSBOX_BOT_TOKEN")?;
    let username = me
        .username
        .with_context(|| format!("bot {} has no username", me.id))?;
    info!("Running as @{}", username);

    let router = SessionRouter::new(
        db,
        client.clone(),
        config.channel_id,
        username,
        config.engine.clone(),
    );
    let state: AppState = Arc::new(AppStateInner {
        router,
        webhook_secret: config.webhook_secret.clone(),
        handlers: TaskTracker::new(),
    });

    // Point Telegram at us, dropping whatever queued up while we were down
    client.delete_webhook(true).await?;
    let webhook_url = config.webhook_url();
    client
        .set_webhook(&webhook_url, config.webhook_secret.as_deref())
        .await
        .context("setWebhook failed")?;
    info!("Webhook set: {}", webhook_url);

    // Background eviction of idle actors
    tokio::spawn(cleanup::run_eviction_loop(state.clone(), config.evict_interval));

    let app = Router::new()
        .route(&config.webhook_path, post(webhook::receive_update))
        .route("/", get(webhook::health))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Confessbox listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down..");
    // Telegram already got its 200 for these, so they will not be redelivered
    if !webhook::drain_handlers(&state, Duration::from_secs(30)).await {
        warn!("Some update handlers did not finish in time");
    }
    if let Err(e) = client.delete_webhook(false).await {
        warn!("Could not remove webhook: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
