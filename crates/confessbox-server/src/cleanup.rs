use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::webhook::AppState;

/// Background task that forgets idle actors.
///
/// Rate-limit entries are only needed for a few cooldowns and open comment
/// sessions for a day at most; after that they are dropped so the maps stay
/// bounded by recent activity.
pub async fn run_eviction_loop(state: AppState, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        let evicted = state.router.evict_idle(Utc::now());
        if evicted > 0 {
            info!("Eviction: dropped {} idle actor entries", evicted);
        }
    }
}
