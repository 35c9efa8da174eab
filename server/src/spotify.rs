//! Client for the Spotify accounts service and web API
//!
//! Covers the three calls the authorization-code flow needs: building the authorize
//! URL, trading the code for tokens, and reading the user's profile. Nothing is retried;
//! the first failure is returned to the caller.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::session::Credentials;
use crate::state::SpotifyOAuthConfig;

/// Permissions requested on every authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    UserReadPrivate,
    UserReadEmail,
    UserTopRead,
    UserReadRecentlyPlayed,
}

impl Scope {
    pub const REQUESTED: [Scope; 4] = [
        Scope::UserReadPrivate,
        Scope::UserReadEmail,
        Scope::UserTopRead,
        Scope::UserReadRecentlyPlayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::UserReadPrivate => "user-read-private",
            Scope::UserReadEmail => "user-read-email",
            Scope::UserTopRead => "user-top-read",
            Scope::UserReadRecentlyPlayed => "user-read-recently-played",
        }
    }

    /// Space separated, as the authorize endpoint expects
    pub fn requested() -> String {
        Self::REQUESTED
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("Request to Spotify failed")]
    Request(#[from] reqwest::Error),

    #[error("Spotify responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode Spotify response")]
    Decode(#[source] reqwest::Error),

    #[error("Token response did not include a refresh token")]
    MissingRefreshToken,
}

/// Body of a successful `/api/token` call
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    config: Arc<SpotifyOAuthConfig>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyOAuthConfig) -> Result<Self, SpotifyError> {
        let http = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// URL of Spotify's consent page.
    ///
    /// `app_redirect` rides along in `state` and comes back untouched on the callback.
    pub fn authorize_url(&self, app_redirect: &str) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}",
            self.config.accounts_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&Scope::requested()),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(app_redirect),
        )
    }

    /// Trade an authorization code for an access and refresh token
    #[tracing::instrument(skip_all, err(Debug))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        let token_url = format!("{}/api/token", self.config.accounts_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let token = error_for_status(response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(SpotifyError::Decode)?;

        info!(
            token_type = ?token.token_type,
            scope = ?token.scope,
            expires_in = ?token.expires_in,
            "Exchanged authorization code"
        );

        Ok(token)
    }

    /// Fetch the current user's profile as raw JSON
    #[tracing::instrument(skip_all, err(Debug))]
    pub async fn fetch_profile(&self, access_token: &str) -> Result<serde_json::Value, SpotifyError> {
        let profile_url = format!("{}/v1/me", self.config.api_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&profile_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        error_for_status(response)
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(SpotifyError::Decode)
    }

    /// Run the server-to-server half of the flow: tokens first, then the profile.
    ///
    /// Either both calls succeed or nothing is returned.
    pub async fn complete_authorization(&self, code: &str) -> Result<Credentials, SpotifyError> {
        let token = self.exchange_code(code).await?;
        let refresh_token = token
            .refresh_token
            .ok_or(SpotifyError::MissingRefreshToken)?;

        let user = self.fetch_profile(&token.access_token).await?;

        Ok(Credentials {
            access_token: token.access_token,
            refresh_token,
            user,
        })
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SpotifyError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(accounts_url: &str, api_url: &str) -> SpotifyOAuthConfig {
        SpotifyOAuthConfig {
            client_id: fixtures::spotify::CLIENT_ID.to_string(),
            client_secret: fixtures::spotify::CLIENT_SECRET.to_string(),
            redirect_uri: "http://localhost:3000/auth/spotify/callback".to_string(),
            accounts_url: accounts_url.to_string(),
            api_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    async fn fixture_client() -> SpotifyClient {
        let addr = fixtures::spawn(fixtures::spotify::router()).await.unwrap();
        let base = format!("http://{addr}");
        SpotifyClient::new(config(&base, &base)).unwrap()
    }

    #[test]
    fn test_requested_scopes() {
        assert_eq!(
            Scope::requested(),
            "user-read-private user-read-email user-top-read user-read-recently-played"
        );
    }

    #[test]
    fn test_authorize_url() {
        let client = SpotifyClient::new(config("https://accounts.example.com/", "")).unwrap();

        let url = client.authorize_url("myapp://cb");

        assert_eq!(
            url,
            "https://accounts.example.com/authorize?response_type=code\
             &client_id=fixture-client-id\
             &scope=user-read-private%20user-read-email%20user-top-read%20user-read-recently-played\
             &redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fspotify%2Fcallback\
             &state=myapp%3A%2F%2Fcb"
        );
    }

    #[tokio::test]
    async fn test_complete_authorization() {
        let client = fixture_client().await;

        let credentials = client
            .complete_authorization(fixtures::spotify::VALID_CODE)
            .await
            .unwrap();

        assert_eq!(credentials.access_token, fixtures::spotify::ACCESS_TOKEN);
        assert_eq!(credentials.refresh_token, fixtures::spotify::REFRESH_TOKEN);
        assert_eq!(credentials.user["id"], fixtures::spotify::USER_ID);
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let client = fixture_client().await;

        let err = client
            .exchange_code(fixtures::spotify::BAD_CODE)
            .await
            .unwrap_err();

        match err {
            SpotifyError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("Expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_profile_with_bad_token() {
        let client = fixture_client().await;

        let err = client.fetch_profile("expired-token").await.unwrap_err();

        assert!(matches!(
            err,
            SpotifyError::Status { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        // Nothing listens on port 1
        let client = SpotifyClient::new(config("http://127.0.0.1:1", "http://127.0.0.1:1")).unwrap();

        let err = client
            .complete_authorization(fixtures::spotify::VALID_CODE)
            .await
            .unwrap_err();

        assert!(matches!(err, SpotifyError::Request(_)));
    }

    #[tokio::test]
    async fn test_token_without_refresh_token() {
        let client = fixture_client().await;

        let err = client
            .complete_authorization(fixtures::spotify::NO_REFRESH_CODE)
            .await
            .unwrap_err();

        assert!(matches!(err, SpotifyError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn test_token_body_not_json() {
        let client = fixture_client().await;

        let err = client
            .exchange_code(fixtures::spotify::MALFORMED_CODE)
            .await
            .unwrap_err();

        assert!(matches!(err, SpotifyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_upstream_that_never_answers_times_out() {
        // Accepts connections and holds them open without ever writing a byte
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = config(&base, &base);
        config.timeout = Duration::from_millis(200);
        let client = SpotifyClient::new(config).unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            client.complete_authorization(fixtures::spotify::VALID_CODE),
        )
        .await
        .expect("client timeout should fire first")
        .unwrap_err();

        match err {
            SpotifyError::Request(e) => assert!(e.is_timeout()),
            other => panic!("Expected a request error, got {other:?}"),
        }
    }
}
