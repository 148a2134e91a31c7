//! Liveness probe and service banner.

use axum::Json;
use serde::Serialize;

use crate::errors::ApiResponse;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub async fn live() -> &'static str {
    "OK"
}

pub async fn index() -> Json<ApiResponse<ServiceInfo>> {
    ApiResponse::success(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
