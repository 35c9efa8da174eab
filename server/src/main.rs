use spotify_auth::{
    cron, routes,
    server::run_server,
    setup::{setup_sentry, setup_tracing},
    state::AppState,
};
use tracing::info;

fn main() -> color_eyre::Result<()> {
    // Initialize Sentry for error tracking
    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> color_eyre::Result<()> {
    setup_tracing("spotify-auth")?;

    let app_state = AppState::from_env()?;
    info!(version = app_state.version(), "Spotify auth server starting");

    info!("Spawning application tasks");
    let futures = spawn_application_tasks(app_state);

    futures::future::try_join_all(futures)
        .await?
        .into_iter()
        .collect::<color_eyre::Result<Vec<()>>>()?;

    Ok(())
}

/// Spawn the HTTP server and the session sweeper
fn spawn_application_tasks(
    app_state: AppState,
) -> Vec<tokio::task::JoinHandle<color_eyre::Result<()>>> {
    let mut futures = vec![];

    if is_feature_enabled("SERVER") {
        info!("Server Enabled");
        futures.push(tokio::spawn(run_server(
            routes::routes(app_state.clone()),
            app_state.port,
        )));
    } else {
        info!("Server Disabled");
    }

    if is_feature_enabled("CRON") {
        info!(
            interval_secs = app_state.session_config.sweep_interval.as_secs(),
            "Cron Enabled"
        );
        futures.push(tokio::spawn(cron::run_cron(app_state.clone())));
    } else {
        info!("Cron Disabled");
    }

    futures
}

/// Check if a feature is enabled based on environment variables
fn is_feature_enabled(feature: &str) -> bool {
    std::env::var(format!("{}_DISABLED", feature)).unwrap_or_else(|_| "false".to_string()) != "true"
}
