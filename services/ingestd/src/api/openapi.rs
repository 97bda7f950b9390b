//! OpenAPI schema aggregation for the ingestion API.
use crate::api::{
    channels, devices, flush, ingest, snapshot, stream, system,
    types::{
        Alert, AlertSeverity, AllLatestResponse, BackendHealth, BufferStatsResponse,
        ChannelBufferStats, ChannelCreateRequest, ChannelListResponse, DeviceConfigResponse,
        DeviceRegisterRequest, DeviceRegisterResponse, ErrorResponse, HealthResponse,
        InfoResponse, IngestAccepted, IngestRequest, LatestReadingResponse,
    },
};
use crate::flusher::FlushReport;
use acequia_model::{ChannelConfig, ChannelStatus, DeviceErrorEntry, GpsCoordinates, Reading, SensorType};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "acequia-ingestd",
        version = "v1",
        description = "Irrigation canal telemetry ingestion API"
    ),
    paths(
        ingest::submit_reading,
        snapshot::channel_latest,
        snapshot::all_latest,
        snapshot::buffer_stats,
        flush::trigger_flush,
        stream::stream_all,
        stream::stream_channel,
        channels::create_channel,
        channels::list_channels,
        channels::get_channel,
        devices::register_device,
        devices::device_config,
        system::health,
        system::info
    ),
    components(schemas(
        ErrorResponse,
        IngestRequest,
        IngestAccepted,
        Alert,
        AlertSeverity,
        Reading,
        GpsCoordinates,
        DeviceErrorEntry,
        ChannelStatus,
        SensorType,
        ChannelConfig,
        ChannelCreateRequest,
        ChannelListResponse,
        LatestReadingResponse,
        AllLatestResponse,
        BufferStatsResponse,
        ChannelBufferStats,
        FlushReport,
        DeviceRegisterRequest,
        DeviceRegisterResponse,
        DeviceConfigResponse,
        HealthResponse,
        BackendHealth,
        InfoResponse
    )),
    tags(
        (name = "readings", description = "Telemetry ingestion"),
        (name = "snapshots", description = "Buffered latest readings"),
        (name = "streams", description = "Live reading streams (SSE)"),
        (name = "flush", description = "Manual persistence flush"),
        (name = "channels", description = "Channel administration"),
        (name = "devices", description = "Device provisioning"),
        (name = "system", description = "Health and service info")
    )
)]
pub struct ApiDoc;
