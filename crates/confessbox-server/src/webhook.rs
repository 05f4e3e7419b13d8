use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use confessbox_engine::SessionRouter;

use crate::telegram::{TelegramClient, TgUpdate};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub router: SessionRouter<TelegramClient>,
    pub webhook_secret: Option<String>,
    /// Update handlers still running. Drained on shutdown.
    pub handlers: TaskTracker,
}

/// Accept one update and hand it to the router on its own task, so Telegram
/// gets its 200 right away and slow channel calls never stall the webhook.
pub async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<Value>,
) -> StatusCode {
    if let Some(secret) = &state.webhook_secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            warn!("Webhook call with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    // Undecodable updates are acknowledged too, otherwise Telegram retries them forever.
    let update: TgUpdate = match serde_json::from_value(raw) {
        Ok(update) => update,
        Err(e) => {
            warn!("Undecodable update: {}", e);
            return StatusCode::OK;
        }
    };

    let Some(inbound) = update.into_inbound() else {
        return StatusCode::OK;
    };

    debug!(actor = %inbound.actor, "Dispatching update");
    let handlers = state.handlers.clone();
    handlers.spawn(async move {
        state.router.handle(inbound).await;
    });

    StatusCode::OK
}

/// Stop taking new handlers and wait up to `grace` for the running ones.
/// Returns false if some were still running when the grace period ran out.
pub async fn drain_handlers(state: &AppState, grace: Duration) -> bool {
    state.handlers.close();
    let pending = state.handlers.len();
    if pending > 0 {
        info!("Waiting for {} update handler(s)", pending);
    }
    tokio::time::timeout(grace, state.handlers.wait()).await.is_ok()
}

pub async fn health() -> &'static str {
    "ok"
}
