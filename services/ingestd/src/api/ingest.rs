//! Telemetry ingestion endpoint.
//!
//! # Purpose
//! Validates a device submission, derives flow through the Manning
//! calculator for ultrasonic channels, buffers the reading, and fans it
//! out to live-stream subscribers. Persistence happens later, on flush;
//! the 202 response tells the device how long that window is at most.
use crate::api::error::{
    api_forbidden, api_not_found, api_unauthorized, api_validation_error, from_registry_error,
    ApiError,
};
use crate::api::types::{Alert, AlertSeverity, IngestAccepted, IngestRequest};
use crate::app::AppState;
use acequia_hydraulics::compute;
use acequia_model::{ranges, ChannelConfig, ChannelStatus, Reading, SensorType};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

const BATTERY_WARNING_LEVEL: f64 = 20.0;
const BATTERY_CRITICAL_LEVEL: f64 = 10.0;

#[utoipa::path(
    post,
    path = "/v1/readings",
    tag = "readings",
    request_body = IngestRequest,
    responses(
        (status = 202, description = "Reading accepted and buffered", body = IngestAccepted),
        (status = 400, description = "Validation failed", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Device identity missing", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Device not bound to this channel", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Channel unknown or inactive", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn submit_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestAccepted>), ApiError> {
    let device_id = device_identity(&headers, &body)
        .ok_or_else(|| api_unauthorized("device identity required (X-Device-Id header or device_id field)"))?;

    let channel_id = body
        .channel_id
        .parse::<acequia_model::ChannelId>()
        .map_err(|err| api_validation_error(&err.to_string()))?;

    let config = state
        .registry
        .get(&channel_id)
        .await
        .map_err(from_registry_error)?
        .filter(|c| c.active)
        .ok_or_else(|| api_not_found(&format!("channel {channel_id} not found")))?;

    // First contact binds the device; afterwards a different device on the
    // same channel is rejected.
    match config.device_id.as_deref() {
        None => {
            state
                .registry
                .bind_device(&channel_id, &device_id)
                .await
                .map_err(from_registry_error)?;
            tracing::info!(channel = %channel_id, device = %device_id, "device bound to channel");
        }
        Some(bound) if bound != device_id => {
            tracing::warn!(
                channel = %channel_id,
                device = %device_id,
                bound = %bound,
                "rejected reading from unbound device"
            );
            return Err(api_forbidden("channel is bound to a different device"));
        }
        Some(_) => {}
    }

    validate_ranges(&body).map_err(|err| api_validation_error(&err.to_string()))?;
    let reported_status = body
        .status
        .as_deref()
        .map(ChannelStatus::parse)
        .transpose()
        .map_err(|err| api_validation_error(&err.to_string()))?;

    let now = Utc::now();
    let hydro = flow_metrics(&body, &config);
    let status = reported_status.unwrap_or_else(|| {
        ChannelStatus::from_flow_rate(
            hydro.flow_rate,
            state.settings.status_low_flow,
            state.settings.status_high_flow,
        )
    });

    let reading = Arc::new(Reading {
        channel_id: channel_id.clone(),
        device_id: device_id.clone(),
        sensor_type: config.sensor_type,
        status,
        flow_rate: hydro.flow_rate,
        velocity: hydro.velocity,
        discharge: hydro.discharge,
        water_level: body.water_level,
        depth: hydro.depth,
        area: hydro.area,
        hydraulic_radius: hydro.hydraulic_radius,
        wetted_perimeter: hydro.wetted_perimeter,
        temperature: body.temperature,
        ph: body.ph,
        turbidity: body.turbidity,
        battery_level: body.battery_level,
        signal_strength: body.signal_strength,
        gps: body.gps,
        errors: body.errors.unwrap_or_default(),
        timestamp: body.timestamp.unwrap_or(now),
        received_at: now,
    });

    let buffered = state.buffer.push(Arc::clone(&reading));
    let delivered = state.bus.publish(&channel_id, Arc::clone(&reading));
    metrics::counter!("acequia_ingest_accepted_total").increment(1);
    tracing::debug!(
        channel = %channel_id,
        device = %device_id,
        status = %status,
        buffered,
        delivered,
        "reading accepted"
    );

    let alerts = collect_alerts(&reading);
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            channel_id: channel_id.to_string(),
            device_id,
            status,
            flow_rate: reading.flow_rate,
            timestamp: reading.timestamp,
            buffered,
            flush_interval_seconds: state.settings.flush_interval_secs,
            alerts,
        }),
    ))
}

fn device_identity(headers: &HeaderMap, body: &IngestRequest) -> Option<String> {
    headers
        .get("x-device-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| body.device_id.clone().filter(|v| !v.trim().is_empty()))
}

fn validate_ranges(body: &IngestRequest) -> acequia_model::Result<()> {
    ranges::check_opt("flow_rate", body.flow_rate, ranges::FLOW_RATE)?;
    ranges::check_opt("velocity", body.velocity, ranges::VELOCITY)?;
    ranges::check_opt("discharge", body.discharge, ranges::DISCHARGE)?;
    ranges::check_opt("water_level", body.water_level, ranges::WATER_LEVEL)?;
    ranges::check_opt("depth", body.depth, ranges::DEPTH)?;
    ranges::check_opt("temperature", body.temperature, ranges::TEMPERATURE)?;
    ranges::check_opt("ph", body.ph, ranges::PH)?;
    ranges::check_opt("turbidity", body.turbidity, ranges::TURBIDITY)?;
    ranges::check_opt("battery_level", body.battery_level, ranges::BATTERY_LEVEL)?;
    ranges::check_opt("signal_strength", body.signal_strength, ranges::SIGNAL_STRENGTH)?;
    if let Some(gps) = &body.gps {
        ranges::check("latitude", gps.latitude, ranges::LATITUDE)?;
        ranges::check("longitude", gps.longitude, ranges::LONGITUDE)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct FlowMetrics {
    flow_rate: f64,
    velocity: Option<f64>,
    discharge: Option<f64>,
    depth: Option<f64>,
    area: Option<f64>,
    hydraulic_radius: Option<f64>,
    wetted_perimeter: Option<f64>,
}

/// Ultrasonic channels with geometry derive everything from the measured
/// depth; anything else passes device-reported values through.
fn flow_metrics(body: &IngestRequest, config: &ChannelConfig) -> FlowMetrics {
    if config.sensor_type == SensorType::Ultrasonic {
        if let (Some(depth), Some(geometry)) = (body.depth, config.geometry.as_ref()) {
            let effective_depth = (depth - config.depth_offset).max(0.0);
            let computed = compute(effective_depth, geometry);
            return FlowMetrics {
                flow_rate: computed.flow_rate,
                velocity: Some(computed.velocity),
                discharge: Some(computed.flow_rate),
                depth: Some(effective_depth),
                area: Some(computed.area),
                hydraulic_radius: Some(computed.hydraulic_radius),
                wetted_perimeter: Some(computed.wetted_perimeter),
            };
        }
    }
    FlowMetrics {
        flow_rate: body.flow_rate.unwrap_or(0.0),
        velocity: body.velocity,
        discharge: body.discharge,
        depth: body.depth,
        ..FlowMetrics::default()
    }
}

fn collect_alerts(reading: &Reading) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if reading.status.is_alerting() {
        let severity = if reading.status == ChannelStatus::Error {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        alerts.push(Alert {
            kind: "status".to_string(),
            severity,
            message: format!("channel status is {}", reading.status),
        });
    }
    if let Some(battery) = reading.battery_level {
        if battery < BATTERY_CRITICAL_LEVEL {
            alerts.push(Alert {
                kind: "battery".to_string(),
                severity: AlertSeverity::Critical,
                message: format!("battery critically low: {battery:.0}%"),
            });
        } else if battery < BATTERY_WARNING_LEVEL {
            alerts.push(Alert {
                kind: "battery".to_string(),
                severity: AlertSeverity::Warning,
                message: format!("battery low: {battery:.0}%"),
            });
        }
    }
    alerts
}
