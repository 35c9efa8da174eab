use std::time::Duration;

use serde_json::json;
use spotify_auth::{
    cron::{cleanup_expired_sessions, run_cron},
    session::Credentials,
    state::{AppState, SessionConfig, SpotifyOAuthConfig},
};

fn test_state(session_config: SessionConfig) -> AppState {
    let db = spotify_auth::state::setup_db_pool("postgres://postgres@127.0.0.1:1/spotify_auth")
        .unwrap();

    let spotify = SpotifyOAuthConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://localhost:3000/auth/spotify/callback".to_string(),
        accounts_url: "http://127.0.0.1:1".to_string(),
        api_url: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_secs(1),
    };

    AppState::new(db, spotify, session_config).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        user: json!({ "id": "user-1" }),
    }
}

#[tokio::test]
async fn test_cleanup_leaves_live_sessions() {
    let state = test_state(SessionConfig::default());
    let code = state.sessions.put(credentials()).await;

    assert_eq!(cleanup_expired_sessions(&state).await, 0);
    assert_eq!(state.sessions.take(&code).await, Some(credentials()));
}

#[tokio::test]
async fn test_cron_sweeps_expired_sessions() {
    let state = test_state(SessionConfig {
        ttl: chrono::Duration::zero(),
        sweep_interval: Duration::from_millis(20),
    });

    state.sessions.put(credentials()).await;
    state.sessions.put(credentials()).await;
    assert_eq!(state.sessions.len().await, 2);

    let cron = tokio::spawn(run_cron(state.clone()));
    tokio::time::sleep(Duration::from_millis(200)).await;
    cron.abort();

    assert!(state.sessions.is_empty().await);
}
