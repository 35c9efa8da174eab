//! A fake Spotify accounts + web API server.
//!
//! Only the three endpoints the auth server talks to are implemented. Responses are
//! shaped like the real ones so the production client parses them unchanged.

use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const CLIENT_ID: &str = "fixture-client-id";
pub const CLIENT_SECRET: &str = "fixture-client-secret";

/// The code that completes a normal exchange
pub const VALID_CODE: &str = "abc";
/// A code the token endpoint always rejects, like an already-used one
pub const BAD_CODE: &str = "bad_code";
/// Accepted, but the token response carries no refresh token
pub const NO_REFRESH_CODE: &str = "no_refresh";
/// Accepted with a 200 whose body is not JSON
pub const MALFORMED_CODE: &str = "malformed";

pub const ACCESS_TOKEN: &str = "fixture-access-token";
pub const REFRESH_TOKEN: &str = "fixture-refresh-token";
pub const USER_ID: &str = "fixture-user";

pub fn router() -> Router {
    Router::new()
        .route("/authorize", get(authorize))
        .route("/api/token", post(token))
        .route("/v1/me", get(me))
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    redirect_uri: String,
    state: Option<String>,
}

#[derive(Serialize)]
struct OAuthRedirectParams<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

/// Consent is implied: bounce straight back to the callback with a code
async fn authorize(Query(params): Query<AuthorizeParams>) -> Response {
    info!("Spotify: Handling authorize request");

    let query = serde_urlencoded::to_string(OAuthRedirectParams {
        code: VALID_CODE,
        state: params.state.as_deref(),
    })
    .unwrap_or_default();

    (
        StatusCode::FOUND,
        [(
            header::LOCATION,
            format!("{}?{}", params.redirect_uri, query),
        )],
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    code: Option<String>,
    #[allow(dead_code)]
    redirect_uri: Option<String>,
}

fn oauth_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "error_description": description,
        })),
    )
        .into_response()
}

fn has_valid_client_credentials(headers: &HeaderMap) -> bool {
    let expected = STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}"));

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .is_some_and(|credentials| credentials == expected)
}

async fn token(headers: HeaderMap, Form(form): Form<TokenForm>) -> Response {
    info!("Spotify: Handling token request");

    if !has_valid_client_credentials(&headers) {
        return oauth_error(
            StatusCode::UNAUTHORIZED,
            "invalid_client",
            "Invalid client",
        );
    }

    if form.grant_type != "authorization_code" {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            "grant_type must be authorization_code",
        );
    }

    match form.code.as_deref() {
        Some(VALID_CODE) => Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "scope": "user-read-private user-read-email",
            "expires_in": 3600,
            "refresh_token": REFRESH_TOKEN,
        }))
        .into_response(),
        Some(NO_REFRESH_CODE) => Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "scope": "user-read-private user-read-email",
            "expires_in": 3600,
        }))
        .into_response(),
        Some(MALFORMED_CODE) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            "<html>upstream proxy error</html>",
        )
            .into_response(),
        Some(_) => oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_grant",
            "Invalid authorization code",
        ),
        None => oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing authorization code",
        ),
    }
}

async fn me(headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {ACCESS_TOKEN}"));

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": { "status": 401, "message": "Invalid access token" }
            })),
        )
            .into_response();
    }

    Json(json!({
        "id": USER_ID,
        "display_name": "Fixture User",
        "email": "fixture@example.com",
        "country": "SE",
        "product": "premium",
        "images": [],
    }))
    .into_response()
}
