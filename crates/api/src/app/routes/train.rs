use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::errors;
use crate::app::services::AppServices;

/// Retrain every tenant from the latest snapshot and report accuracies.
pub async fn train(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.train().await {
        Ok(report) => {
            tracing::info!(
                run = %report.run_id,
                trained = report.trained_count(),
                failed = report.failed_count(),
                "training requested via http"
            );
            Json(report).into_response()
        }
        Err(e) => errors::expcat_error_to_response(e),
    }
}
