//! Read-side snapshot endpoints backed by the in-memory buffer. These never
//! touch durable storage; they answer from whatever the buffer holds.
use crate::api::error::{api_not_found, api_validation_error, ApiError};
use crate::api::types::{
    AllLatestResponse, BufferStatsResponse, ChannelBufferStats, LatestReadingResponse,
};
use crate::app::AppState;
use acequia_model::ChannelId;
use axum::extract::{Path, State};
use axum::Json;
use std::collections::BTreeMap;

#[utoipa::path(
    get,
    path = "/v1/channels/{channel_id}/latest",
    tag = "snapshots",
    params(
        ("channel_id" = String, Path, description = "Channel identifier")
    ),
    responses(
        (status = 200, description = "Most recent reading", body = LatestReadingResponse),
        (status = 404, description = "No reading received yet", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn channel_latest(
    Path(channel_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LatestReadingResponse>, ApiError> {
    let channel_id = channel_id
        .parse::<ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;
    let reading = state
        .buffer
        .latest(&channel_id)
        .ok_or_else(|| api_not_found(&format!("no reading received yet for {channel_id}")))?;
    Ok(Json(LatestReadingResponse {
        channel_id: channel_id.to_string(),
        reading: (*reading).clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/channels/latest",
    tag = "snapshots",
    responses(
        (status = 200, description = "Latest reading per channel", body = AllLatestResponse)
    )
)]
pub(crate) async fn all_latest(State(state): State<AppState>) -> Json<AllLatestResponse> {
    let channels: BTreeMap<String, _> = state
        .buffer
        .all_latest()
        .into_iter()
        .map(|(id, reading)| (id.to_string(), (*reading).clone()))
        .collect();
    Json(AllLatestResponse { channels })
}

#[utoipa::path(
    get,
    path = "/v1/buffer/stats",
    tag = "snapshots",
    responses(
        (status = 200, description = "Pending depth per channel", body = BufferStatsResponse)
    )
)]
pub(crate) async fn buffer_stats(State(state): State<AppState>) -> Json<BufferStatsResponse> {
    let channels: BTreeMap<String, ChannelBufferStats> = state
        .buffer
        .stats()
        .into_iter()
        .map(|(id, stats)| {
            (
                id.to_string(),
                ChannelBufferStats {
                    pending: stats.pending,
                    latest_timestamp: stats.latest_timestamp,
                },
            )
        })
        .collect();
    Json(BufferStatsResponse {
        flush_interval_seconds: state.settings.flush_interval_secs,
        channels,
    })
}
