//! Live reading streams over Server-Sent Events.
//!
//! # Contract
//! Each connection first receives the buffered latest reading per matching
//! channel, then every reading accepted after the subscription was
//! registered. The subscription is registered before the snapshot is taken,
//! so a reading accepted mid-handshake is never missed; at worst it appears
//! both in the snapshot and as a live event.
//!
//! Disconnect tears the subscription down through its guard when the
//! response stream is dropped, so abandoned connections cannot accumulate.
use crate::api::error::{api_not_found, api_validation_error, ApiError};
use crate::app::AppState;
use acequia_broadcast::Subscription;
use acequia_model::{ChannelId, Reading};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;

#[utoipa::path(
    get,
    path = "/v1/stream/channels",
    tag = "streams",
    responses(
        (status = 200, description = "SSE stream of readings for every channel")
    )
)]
pub(crate) async fn stream_all(State(state): State<AppState>) -> impl IntoResponse {
    sse_response(&state, None)
}

#[utoipa::path(
    get,
    path = "/v1/stream/channels/{channel_id}",
    tag = "streams",
    params(
        ("channel_id" = String, Path, description = "Channel identifier")
    ),
    responses(
        (status = 200, description = "SSE stream of readings for one channel"),
        (status = 404, description = "Channel not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn stream_channel(
    Path(channel_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = channel_id
        .parse::<ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;
    state
        .registry
        .get(&channel_id)
        .await
        .map_err(crate::api::error::from_registry_error)?
        .ok_or_else(|| api_not_found(&format!("channel {channel_id} not found")))?;
    Ok(sse_response(&state, Some(channel_id)))
}

fn sse_response(
    state: &AppState,
    filter: Option<ChannelId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before snapshotting so nothing accepted during the
    // handshake falls between snapshot and live delivery.
    let subscription = state.bus.subscribe(filter.clone());

    let mut snapshot: Vec<(ChannelId, std::sync::Arc<Reading>)> = match &filter {
        Some(channel_id) => state
            .buffer
            .latest(channel_id)
            .map(|reading| (channel_id.clone(), reading))
            .into_iter()
            .collect(),
        None => state.buffer.all_latest().into_iter().collect(),
    };
    snapshot.sort_by(|(a, _), (b, _)| a.cmp(b));

    let initial = stream::iter(
        snapshot
            .into_iter()
            .map(|(_, reading)| Ok(reading_event(&reading))),
    );
    let live = stream::unfold(subscription, |mut sub: Subscription| async move {
        sub.recv()
            .await
            .map(|event| (Ok(reading_event(&event.reading)), sub))
    });

    Sse::new(initial.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(state.settings.sse_keepalive)
            .text("ping"),
    )
}

fn reading_event(reading: &Reading) -> Event {
    match Event::default().event("reading").json_data(reading) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize reading for SSE");
            Event::default().event("error").data("serialization failed")
        }
    }
}
