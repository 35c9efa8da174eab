use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::routes::Found;

/// A handler failure: the report is logged, only `R` reaches the client
#[derive(Debug)]
pub struct ServerError<R: IntoResponse>(pub(crate) color_eyre::Report, pub(crate) R);

pub type ServerResult<S, F = Response> = Result<S, ServerError<F>>;

impl<R: IntoResponse> IntoResponse for ServerError<R> {
    fn into_response(self) -> Response {
        let response = self.1.into_response();

        if response.status().is_server_error() {
            tracing::error!(error = ?self.0, "Request Error");
        } else {
            tracing::warn!(error = ?self.0, status = %response.status(), "Request Rejected");
        }

        response
    }
}

/// `{ "success": false, "error": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

pub type JsonError = (StatusCode, Json<ErrorBody>);

pub fn json_error(status: StatusCode, message: impl Into<String>) -> JsonError {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: message.into(),
        }),
    )
}

pub(crate) trait WithJson<T> {
    fn with_json(
        self,
        status: StatusCode,
        message: &str,
    ) -> Result<T, ServerError<JsonError>>;
}

impl<T> WithJson<T> for Result<T, color_eyre::Report> {
    fn with_json(
        self,
        status: StatusCode,
        message: &str,
    ) -> Result<T, ServerError<JsonError>> {
        self.map_err(|err| ServerError(err, json_error(status, message)))
    }
}

pub(crate) trait WithRedirect<T> {
    fn with_redirect(self, redirect: Found) -> Result<T, ServerError<Found>>;
}

impl<T> WithRedirect<T> for Result<T, color_eyre::Report> {
    fn with_redirect(self, redirect: Found) -> Result<T, ServerError<Found>> {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(ServerError(err, redirect)),
        }
    }
}
