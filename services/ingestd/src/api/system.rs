//! Health and service-info endpoints.
use crate::api::types::{BackendHealth, HealthResponse, InfoResponse};
use crate::app::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "All backends reachable", body = HealthResponse),
        (status = 503, description = "One or more backends unreachable", body = HealthResponse)
    )
)]
pub(crate) async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let registry_healthy = state.registry.health_check().await.is_ok();
    let sink_healthy = state.sink.health_check().await.is_ok();
    let healthy = registry_healthy && sink_healthy;
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        registry: BackendHealth {
            backend: state.registry.backend_name().to_string(),
            healthy: registry_healthy,
        },
        sink: BackendHealth {
            backend: state.sink.backend_name().to_string(),
            healthy: sink_healthy,
        },
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service build and storage info", body = InfoResponse)
    )
)]
pub(crate) async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "acequia-ingestd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.sink.backend_name().to_string(),
        flush_interval_seconds: state.settings.flush_interval_secs,
    })
}
