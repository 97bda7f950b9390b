//! Device provisioning endpoints: explicit registration and the
//! configuration a device pulls on boot.
use crate::api::error::{
    api_not_found, api_unauthorized, api_validation_error, from_registry_error, ApiError,
};
use crate::api::types::{DeviceConfigResponse, DeviceRegisterRequest, DeviceRegisterResponse};
use crate::app::AppState;
use acequia_model::{ChannelId, SensorType};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

/// Reporting defaults pushed down with a device's configuration.
const REPORT_INTERVAL_SECONDS: u64 = 300;
const BATTERY_WARNING_LEVEL: f64 = 20.0;
const SIGNAL_WARNING_LEVEL: f64 = -100.0;

#[utoipa::path(
    post,
    path = "/v1/devices/register",
    tag = "devices",
    request_body = DeviceRegisterRequest,
    responses(
        (status = 200, description = "Device bound to channel", body = DeviceRegisterResponse),
        (status = 401, description = "Device identity missing", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Channel not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn register_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeviceRegisterRequest>,
) -> Result<Json<DeviceRegisterResponse>, ApiError> {
    let device_id = headers
        .get("x-device-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.device_id.clone().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| {
            api_unauthorized("device identity required (X-Device-Id header or device_id field)")
        })?;
    let channel_id = body
        .channel_id
        .parse::<ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;
    let config = state
        .registry
        .get(&channel_id)
        .await
        .map_err(from_registry_error)?
        .ok_or_else(|| api_not_found(&format!("channel {channel_id} not found")))?;
    // Explicit registration rebinds unconditionally; it is the operator's
    // way to swap hardware on a channel.
    state
        .registry
        .bind_device(&channel_id, &device_id)
        .await
        .map_err(from_registry_error)?;
    tracing::info!(channel = %channel_id, device = %device_id, "device registered");
    Ok(Json(DeviceRegisterResponse {
        device_id,
        channel_id: channel_id.to_string(),
        channel_name: config.name,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/devices/{device_id}/config",
    tag = "devices",
    params(
        ("device_id" = String, Path, description = "Device identifier")
    ),
    responses(
        (status = 200, description = "Configuration for the device", body = DeviceConfigResponse),
        (status = 404, description = "Device not bound to any channel", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn device_config(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeviceConfigResponse>, ApiError> {
    let config = state
        .registry
        .find_by_device(&device_id)
        .await
        .map_err(from_registry_error)?
        .ok_or_else(|| api_not_found(&format!("device {device_id} is not bound to any channel")))?;
    let sensor_type = match config.sensor_type {
        SensorType::Radar => "radar",
        SensorType::Ultrasonic => "ultrasonic",
    };
    Ok(Json(DeviceConfigResponse {
        device_id,
        channel_id: config.channel_id.to_string(),
        channel_name: config.name,
        sensor_type: sensor_type.to_string(),
        depth_offset: config.depth_offset,
        geometry: config.geometry,
        report_interval_seconds: REPORT_INTERVAL_SECONDS,
        battery_warning_level: BATTERY_WARNING_LEVEL,
        signal_warning_level: SIGNAL_WARNING_LEVEL,
    }))
}
