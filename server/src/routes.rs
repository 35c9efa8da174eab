use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json,
};
use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use serde::Serialize;

use crate::{
    errors::{JsonError, ServerResult, WithJson},
    state::AppState,
};

pub mod exchange;
pub mod spotify;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(root))
        .route("/db-test", get(db_test))
        // Spotify OAuth routes
        .route("/auth/spotify", get(spotify::authorize))
        .route("/auth/spotify/callback", get(spotify::callback))
        .route("/auth/exchange", get(exchange::exchange))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}

/// A `302 Found` redirect.
///
/// `axum::response::Redirect` only offers 303, 307 and 308, and app deep links are
/// expected to receive a plain 302.
#[derive(Debug, Clone)]
pub struct Found(pub String);

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.0)]).into_response()
    }
}

/// Append `key=value` to `target`, keeping any query the target already carries.
/// The parameter goes in front of a `#fragment`, which stays at the end.
pub fn with_query(target: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match target.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (target, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };

    let mut url = format!(
        "{}{}{}={}",
        base,
        separator,
        urlencoding::encode(key),
        urlencoding::encode(value)
    );
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }

    url
}

async fn root() -> &'static str {
    "Spotify auth server is running"
}

#[derive(Serialize)]
struct DbTestResponse {
    success: bool,
    time: DateTime<Utc>,
}

/// Round trip to the database to prove the connection works
async fn db_test(State(state): State<AppState>) -> ServerResult<Json<DbTestResponse>, JsonError> {
    let time = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
        .fetch_one(&state.db)
        .await
        .wrap_err("Database connectivity check failed")
        .with_json(StatusCode::INTERNAL_SERVER_ERROR, "Database connection failed")?;

    Ok(Json(DbTestResponse {
        success: true,
        time,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query_on_bare_target() {
        assert_eq!(
            with_query("myapp://cb", "error", "no_code"),
            "myapp://cb?error=no_code"
        );
    }

    #[test]
    fn test_with_query_on_target_with_query() {
        assert_eq!(
            with_query("https://app.example.com/done?tab=music", "code", "abc123"),
            "https://app.example.com/done?tab=music&code=abc123"
        );
    }

    #[test]
    fn test_with_query_before_fragment() {
        assert_eq!(
            with_query("myapp://cb#done", "error", "no_code"),
            "myapp://cb?error=no_code#done"
        );
        assert_eq!(
            with_query("https://app.example.com/cb?tab=1#top", "code", "abc123"),
            "https://app.example.com/cb?tab=1&code=abc123#top"
        );
    }

    #[test]
    fn test_with_query_encodes_value() {
        assert_eq!(with_query("myapp://cb", "code", "a b&c"), "myapp://cb?code=a%20b%26c");
    }

    #[test]
    fn test_found_is_302() {
        let response = Found("myapp://cb?code=abc".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "myapp://cb?code=abc");
    }
}
