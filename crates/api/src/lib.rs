//! HTTP API: routing, tenant resolution, and request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;
