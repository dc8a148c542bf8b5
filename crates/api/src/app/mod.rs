//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: training orchestrator, inference engine, and their stores
//! - `routes/`: HTTP handlers
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Tenant-scoped routes: require the tenant header.
    let scoped = routes::router().layer(axum::middleware::from_fn(middleware::tenant_middleware));

    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .route("/train", axum::routing::post(routes::train::train))
        .merge(scoped)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
