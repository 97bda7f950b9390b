//! Channel administration endpoints.
use crate::api::error::{api_not_found, api_validation_error, from_registry_error, ApiError};
use crate::api::types::{ChannelCreateRequest, ChannelListResponse};
use crate::app::AppState;
use acequia_model::{ChannelConfig, ChannelId, SensorType};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    post,
    path = "/v1/channels",
    tag = "channels",
    request_body = ChannelCreateRequest,
    responses(
        (status = 201, description = "Channel registered", body = ChannelConfig),
        (status = 400, description = "Validation failed", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Channel already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_channel(
    State(state): State<AppState>,
    Json(body): Json<ChannelCreateRequest>,
) -> Result<(StatusCode, Json<ChannelConfig>), ApiError> {
    let channel_id = body
        .channel_id
        .parse::<ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;
    let sensor_type = match body.sensor_type.as_deref() {
        None => SensorType::default(),
        Some("radar") => SensorType::Radar,
        Some("ultrasonic") => SensorType::Ultrasonic,
        Some(other) => {
            return Err(api_validation_error(&format!(
                "unknown sensor type {other:?} (expected radar or ultrasonic)"
            )))
        }
    };
    if sensor_type == SensorType::Ultrasonic && body.geometry.is_none() {
        return Err(api_validation_error(
            "ultrasonic channels require geometry for flow computation",
        ));
    }
    if let Some(offset) = body.depth_offset {
        if !offset.is_finite() || offset < 0.0 {
            return Err(api_validation_error("depth_offset must be finite and >= 0"));
        }
    }
    let config = ChannelConfig {
        channel_id,
        name: body.name,
        sensor_type,
        geometry: body.geometry,
        depth_offset: body.depth_offset.unwrap_or(0.0),
        device_id: None,
        active: body.active.unwrap_or(true),
    };
    let created = state
        .registry
        .create(config)
        .await
        .map_err(from_registry_error)?;
    tracing::info!(channel = %created.channel_id, "channel registered");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/v1/channels",
    tag = "channels",
    responses(
        (status = 200, description = "All registered channels", body = ChannelListResponse)
    )
)]
pub(crate) async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let channels = state.registry.list().await.map_err(from_registry_error)?;
    Ok(Json(ChannelListResponse { channels }))
}

#[utoipa::path(
    get,
    path = "/v1/channels/{channel_id}",
    tag = "channels",
    params(
        ("channel_id" = String, Path, description = "Channel identifier")
    ),
    responses(
        (status = 200, description = "Channel configuration", body = ChannelConfig),
        (status = 404, description = "Channel not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_channel(
    Path(channel_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ChannelConfig>, ApiError> {
    let channel_id = channel_id
        .parse::<ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;
    let config = state
        .registry
        .get(&channel_id)
        .await
        .map_err(from_registry_error)?
        .ok_or_else(|| api_not_found(&format!("channel {channel_id} not found")))?;
    Ok(Json(config))
}
