use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use expcat_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

/// Header carrying the already-authenticated tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolve the tenant from [`TENANT_HEADER`] and attach a [`TenantContext`].
///
/// Identity is established upstream; this layer only validates the shape.
pub async fn tenant_middleware(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(t) => t,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "invalid_input", message),
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, String> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or_else(|| format!("missing {TENANT_HEADER} header"))?;

    let raw = header
        .to_str()
        .map_err(|_| format!("{TENANT_HEADER} is not valid ASCII"))?;

    TenantId::new(raw.trim()).map_err(|e| e.to_string())
}
