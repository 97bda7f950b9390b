//! Request and response bodies for the HTTP API.
use acequia_hydraulics::Geometry;
use acequia_model::{ChannelConfig, ChannelStatus, DeviceErrorEntry, GpsCoordinates, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Uniform error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// One telemetry submission from a field device.
///
/// `channel_id` is the only required field; everything else defaults to
/// absent. `device_id` may come from the body or the `X-Device-Id` header
/// (the header wins).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IngestRequest {
    pub channel_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    /// Reported status; derived from flow rate when absent.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub flow_rate: Option<f64>,
    #[serde(default)]
    pub velocity: Option<f64>,
    #[serde(default)]
    pub discharge: Option<f64>,
    #[serde(default)]
    pub water_level: Option<f64>,
    /// Raw measured depth (m); drives the Manning calculator on
    /// ultrasonic channels.
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub turbidity: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub signal_strength: Option<f64>,
    #[serde(default)]
    pub gps: Option<GpsCoordinates>,
    #[serde(default)]
    pub errors: Option<Vec<DeviceErrorEntry>>,
    /// Device event time; server receipt time is used when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Operator alert raised while accepting a reading, echoed in the
/// ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
}

/// 202 body for an accepted reading.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestAccepted {
    pub channel_id: String,
    pub device_id: String,
    pub status: ChannelStatus,
    pub flow_rate: f64,
    pub timestamp: DateTime<Utc>,
    /// Pending-queue depth for this channel after the push.
    pub buffered: usize,
    /// How long until the reading is durably persisted, at most.
    pub flush_interval_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestReadingResponse {
    pub channel_id: String,
    pub reading: Reading,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllLatestResponse {
    /// Latest reading per channel, keyed by channel id.
    pub channels: BTreeMap<String, Reading>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChannelBufferStats {
    pub pending: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BufferStatsResponse {
    pub flush_interval_seconds: u64,
    pub channels: BTreeMap<String, ChannelBufferStats>,
}

/// Channel registration request. The id is validated and normalized the
/// same way the ingestion path does it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ChannelCreateRequest {
    pub channel_id: String,
    pub name: String,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub depth_offset: Option<f64>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DeviceRegisterRequest {
    pub channel_id: String,
    /// Device identity when the `X-Device-Id` header is absent.
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceRegisterResponse {
    pub device_id: String,
    pub channel_id: String,
    pub channel_name: String,
}

/// Configuration pushed down to a field device on request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceConfigResponse {
    pub device_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub sensor_type: String,
    pub depth_offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<Geometry>,
    /// How often the device should report, in seconds.
    pub report_interval_seconds: u64,
    /// Battery percentage below which the device should flag itself.
    pub battery_warning_level: f64,
    /// Signal strength (dBm) below which the device should flag itself.
    pub signal_warning_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackendHealth {
    pub backend: String,
    pub healthy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub registry: BackendHealth,
    pub sink: BackendHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub storage: String,
    pub flush_interval_seconds: u64,
}
