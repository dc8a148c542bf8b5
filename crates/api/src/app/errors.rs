use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use expcat_core::ExpcatError;

pub fn status_for(err: &ExpcatError) -> StatusCode {
    match err {
        ExpcatError::NotFound(_) => StatusCode::NOT_FOUND,
        ExpcatError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ExpcatError::Busy => StatusCode::CONFLICT,
        ExpcatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ExpcatError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        ExpcatError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn expcat_error_to_response(err: ExpcatError) -> axum::response::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, code = err.code(), "request failed");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
