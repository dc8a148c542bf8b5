use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub async fn predict(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::PredictQuery>,
) -> axum::response::Response {
    match services.predict(tenant.tenant_id(), query.description.as_deref()) {
        Ok(category) => Json(dto::PredictResponse { category }).into_response(),
        Err(e) => errors::expcat_error_to_response(e),
    }
}

pub async fn predict_bulk(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::BulkPredictRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text());
        }
    };

    match services
        .predict_bulk(tenant.tenant_id().clone(), body.descriptions)
        .await
    {
        Ok(categories) => Json(dto::BulkPredictResponse { categories }).into_response(),
        Err(e) => errors::expcat_error_to_response(e),
    }
}
