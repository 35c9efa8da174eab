use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use color_eyre::eyre::eyre;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    errors::{JsonError, ServerResult, WithJson, WithRedirect},
    routes::{with_query, Found},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    /// Where the calling app wants the user sent once the flow completes
    pub redirect_uri: Option<String>,
}

/// Start the Spotify OAuth flow.
///
/// The app's redirect target is carried through Spotify in `state`. It is echoed back
/// verbatim and is not validated as anything more than an opaque string.
#[tracing::instrument(skip_all)]
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> ServerResult<Found, JsonError> {
    let app_redirect = params
        .redirect_uri
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| eyre!("Authorize called without a redirect_uri"))
        .with_json(StatusCode::BAD_REQUEST, "redirect_uri parameter is required")?;

    info!(app_redirect = %app_redirect, "Redirecting to Spotify authorization");

    Ok(Found(state.spotify.authorize_url(&app_redirect)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Handle Spotify's redirect back after the user approved (or declined) access
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let app_target = params
        .state
        .filter(|target| !target.is_empty())
        .unwrap_or_else(|| state.default_app_redirect.clone());

    if let Some(error) = &params.error {
        warn!(error = %error, "Spotify returned an authorization error");
    }

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        warn!("No code parameter in callback");
        return Found(with_query(&app_target, "error", "no_code")).into_response();
    };

    complete_authorization(&state, &code, &app_target)
        .await
        .into_response()
}

/// Exchange the code, fetch the profile and park the result behind a session code
async fn complete_authorization(
    state: &AppState,
    code: &str,
    app_target: &str,
) -> ServerResult<Found, Found> {
    let credentials = state
        .spotify
        .complete_authorization(code)
        .await
        .map_err(color_eyre::Report::from)
        .with_redirect(Found(with_query(
            app_target,
            "error",
            "authentication_failed",
        )))?;

    let session_code = state.sessions.put(credentials).await;
    info!("Authentication successful, issued session code");

    Ok(Found(with_query(app_target, "code", &session_code)))
}
