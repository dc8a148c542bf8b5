use axum::{Json, http::StatusCode, response::IntoResponse};

use expcat_core::MODEL_NAME;

/// Smoke endpoint.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "api": MODEL_NAME,
        "running": true,
    }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
