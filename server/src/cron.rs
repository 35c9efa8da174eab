use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::state::AppState;

/// Run the session sweep on a fixed interval for the lifetime of the process
pub async fn run_cron(app_state: AppState) -> color_eyre::Result<()> {
    let mut interval = tokio::time::interval(app_state.session_config.sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately; there is nothing to sweep at startup
    interval.tick().await;

    loop {
        interval.tick().await;
        cleanup_expired_sessions(&app_state).await;
    }
}

/// Clean up session codes that expired without being exchanged
#[tracing::instrument(skip_all)]
pub async fn cleanup_expired_sessions(state: &AppState) -> usize {
    let removed = state.sessions.sweep(Utc::now()).await;
    let remaining = state.sessions.len().await;

    info!(removed, remaining, "Removed expired session codes");

    removed
}
