//! Application state and router assembly.
use crate::api;
use crate::config::Config;
use crate::flusher::Flusher;
use crate::registry::ChannelRegistry;
use crate::sink::ReadingSink;
use acequia_broadcast::ReadingBus;
use acequia_buffer::ReadingBuffer;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Settings the handlers need at request time, extracted from [`Config`]
/// so tests can build state without touching the environment.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub flush_interval_secs: u64,
    pub sse_keepalive: Duration,
    pub status_low_flow: f64,
    pub status_high_flow: f64,
}

impl RuntimeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flush_interval_secs: config.flush_interval_secs,
            sse_keepalive: config.sse_keepalive(),
            status_low_flow: config.status_low_flow,
            status_high_flow: config.status_high_flow,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ChannelRegistry>,
    pub sink: Arc<dyn ReadingSink>,
    pub buffer: Arc<ReadingBuffer>,
    pub bus: Arc<ReadingBus>,
    pub flusher: Arc<Flusher>,
    pub settings: RuntimeSettings,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn ChannelRegistry>,
        sink: Arc<dyn ReadingSink>,
        bus: ReadingBus,
        settings: RuntimeSettings,
    ) -> Self {
        let buffer = Arc::new(ReadingBuffer::new());
        let flusher = Arc::new(Flusher::new(Arc::clone(&buffer), Arc::clone(&sink)));
        Self {
            registry,
            sink,
            buffer,
            bus: Arc::new(bus),
            flusher,
            settings,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/readings", post(api::ingest::submit_reading))
        .route(
            "/v1/channels",
            post(api::channels::create_channel).get(api::channels::list_channels),
        )
        .route("/v1/channels/latest", get(api::snapshot::all_latest))
        .route("/v1/channels/:channel_id", get(api::channels::get_channel))
        .route(
            "/v1/channels/:channel_id/latest",
            get(api::snapshot::channel_latest),
        )
        .route("/v1/buffer/stats", get(api::snapshot::buffer_stats))
        .route("/v1/flush", post(api::flush::trigger_flush))
        .route("/v1/stream/channels", get(api::stream::stream_all))
        .route(
            "/v1/stream/channels/:channel_id",
            get(api::stream::stream_channel),
        )
        .route("/v1/devices/register", post(api::devices::register_device))
        .route(
            "/v1/devices/:device_id/config",
            get(api::devices::device_config),
        )
        .route("/v1/system/health", get(api::system::health))
        .route("/v1/system/info", get(api::system::info))
        .merge(
            SwaggerUi::new("/docs").url("/v1/openapi.json", api::openapi::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
