use axum::{
    Router,
    routing::{get, post},
};

pub mod predict;
pub mod system;
pub mod train;

/// Router for tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/predict", get(predict::predict))
        .route("/predict/bulk", post(predict::predict_bulk))
}
