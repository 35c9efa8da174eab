use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use color_eyre::eyre::eyre;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{JsonError, ServerResult, WithJson},
    session::Credentials,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ExchangeParams {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// Trade a session code for the credentials it stands for.
///
/// The code is consumed by the first successful call; repeating it yields a 404.
#[tracing::instrument(skip_all)]
pub async fn exchange(
    State(state): State<AppState>,
    Query(params): Query<ExchangeParams>,
) -> ServerResult<Json<ExchangeResponse>, JsonError> {
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| eyre!("Exchange called without a code"))
        .with_json(StatusCode::BAD_REQUEST, "code parameter is required")?;

    let credentials = state
        .sessions
        .take(&code)
        .await
        .ok_or_else(|| eyre!("Session code not found, consumed, or expired"))
        .with_json(StatusCode::NOT_FOUND, "Invalid or expired session code")?;

    Ok(Json(ExchangeResponse {
        success: true,
        credentials,
    }))
}
