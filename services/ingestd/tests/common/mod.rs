#![allow(dead_code)]
use acequia_broadcast::ReadingBus;
use acequia_hydraulics::{CrossSection, Geometry};
use acequia_model::{ChannelConfig, ChannelId, SensorType};
use ingestd::app::{AppState, RuntimeSettings};
use ingestd::registry::MemoryRegistry;
use ingestd::sink::{MemorySink, ReadingSink};
use std::sync::Arc;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Radar channel with no device bound yet; first contact binds.
pub fn radar_channel() -> ChannelConfig {
    ChannelConfig {
        channel_id: ChannelId::parse("west-main").expect("id"),
        name: "West Main Canal".to_string(),
        sensor_type: SensorType::Radar,
        geometry: None,
        depth_offset: 0.0,
        device_id: None,
        active: true,
    }
}

/// Ultrasonic channel with trapezoidal geometry; depth 1.3 minus the
/// 0.1 offset computes a flow of about 5.294.
pub fn ultrasonic_channel() -> ChannelConfig {
    ChannelConfig {
        channel_id: ChannelId::parse("east-lateral").expect("id"),
        name: "East Lateral".to_string(),
        sensor_type: SensorType::Ultrasonic,
        geometry: Some(Geometry {
            cross_section: CrossSection::Trapezoid {
                bottom_width: 3.0,
                side_slope: 1.5,
            },
            slope: 0.0005,
            roughness: 0.025,
            unit_factor: 1.0,
            max_depth: None,
        }),
        depth_offset: 0.1,
        device_id: None,
        active: true,
    }
}

pub fn state_with_sink(sink: Arc<dyn ReadingSink>) -> AppState {
    let registry = MemoryRegistry::with_channels([radar_channel(), ultrasonic_channel()]);
    AppState::new(
        Arc::new(registry),
        sink,
        ReadingBus::new(),
        RuntimeSettings::default(),
    )
}

pub fn seeded_state() -> AppState {
    state_with_sink(Arc::new(MemorySink::new()))
}
