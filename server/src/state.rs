use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::session::{InMemorySessionStore, SessionStore, DEFAULT_SESSION_TTL_SECS};
use crate::spotify::SpotifyClient;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";
pub const DEFAULT_APP_REDIRECT: &str = "myapp://callback";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_PORT: u16 = 3000;

fn require_env(name: &str) -> color_eyre::Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable not set", name))
}

fn env_or<T>(name: &str, default: T) -> color_eyre::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .wrap_err_with(|| format!("Failed to parse {} ({:?})", name, value)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone, Debug)]
pub struct SpotifyOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// This service's own callback, registered with Spotify
    pub redirect_uri: String,
    /// Host serving `/authorize` and `/api/token`
    pub accounts_url: String,
    /// Host serving `/v1/me`
    pub api_url: String,
    /// Applied to every call made to Spotify
    pub timeout: Duration,
}

impl SpotifyOAuthConfig {
    pub fn from_env() -> color_eyre::Result<Self> {
        Ok(Self {
            client_id: require_env("SPOTIFY_CLIENT_ID")?,
            client_secret: require_env("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: require_env("SPOTIFY_REDIRECT_URI")?,
            accounts_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| DEFAULT_ACCOUNTS_URL.to_string()),
            api_url: env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_millis(env_or(
                "UPSTREAM_TIMEOUT_MS",
                DEFAULT_UPSTREAM_TIMEOUT_MS,
            )?),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub ttl: chrono::Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> color_eyre::Result<Self> {
        let ttl_secs: u32 = env_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS as u32)?;
        let sweep_secs: u64 = env_or("SESSION_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        if sweep_secs == 0 {
            return Err(eyre!("SESSION_SWEEP_INTERVAL_SECS must be greater than zero"));
        }

        Ok(Self {
            ttl: chrono::Duration::seconds(i64::from(ttl_secs)),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub spotify: SpotifyClient,
    pub sessions: Arc<dyn SessionStore>,
    pub session_config: SessionConfig,
    /// Where the callback sends the user when Spotify didn't echo a `state`
    pub default_app_redirect: String,
    pub port: u16,
}

impl AppState {
    pub fn from_env() -> color_eyre::Result<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let pool = setup_db_pool(&database_url)?;

        let spotify_config = SpotifyOAuthConfig::from_env()?;
        tracing::info!(
            accounts_url = %spotify_config.accounts_url,
            api_url = %spotify_config.api_url,
            redirect_uri = %spotify_config.redirect_uri,
            "Loaded Spotify OAuth config"
        );

        let mut state = Self::new(pool, spotify_config, SessionConfig::from_env()?)?;
        state.default_app_redirect =
            env::var("APP_DEFAULT_REDIRECT").unwrap_or_else(|_| DEFAULT_APP_REDIRECT.to_string());
        state.port = env_or("PORT", DEFAULT_PORT)?;

        Ok(state)
    }

    /// Build state from already loaded pieces, with the in-memory session store
    pub fn new(
        db: PgPool,
        spotify_config: SpotifyOAuthConfig,
        session_config: SessionConfig,
    ) -> color_eyre::Result<Self> {
        let spotify =
            SpotifyClient::new(spotify_config).wrap_err("Failed to build Spotify HTTP client")?;

        Ok(Self {
            db,
            spotify,
            sessions: Arc::new(InMemorySessionStore::new(session_config.ttl)),
            session_config,
            default_app_redirect: DEFAULT_APP_REDIRECT.to_string(),
            port: DEFAULT_PORT,
        })
    }

    pub fn version(&self) -> &'static str {
        env!("VERGEN_GIT_SHA")
    }
}

/// Create the Postgres pool without connecting.
///
/// Nothing else needs the database, so an outage only shows up on `/db-test` instead of
/// keeping the auth routes from starting.
pub fn setup_db_pool(database_url: &str) -> color_eyre::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .wrap_err("Invalid DATABASE_URL")?;

    Ok(pool)
}
