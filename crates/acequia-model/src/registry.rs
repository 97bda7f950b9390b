use crate::ChannelId;
use acequia_hydraulics::Geometry;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sensor family mounted on a channel. Ultrasonic sensors report raw depth
/// and need the Manning calculator; radar sensors report flow directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Radar,
    Ultrasonic,
}

impl Default for SensorType {
    fn default() -> Self {
        Self::Radar
    }
}

/// Registry record for one channel, consumed read-only by the ingestion
/// path. The device binding is the only field the ingestion service
/// mutates (first contact binds; later mismatches are rejected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChannelConfig {
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub sensor_type: SensorType,
    /// Manning parameters; required for ultrasonic channels to compute flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<Geometry>,
    /// Calibration offset subtracted from raw depth before computation.
    #[serde(default)]
    pub depth_offset: f64,
    /// Device currently bound to this channel, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use acequia_hydraulics::CrossSection;

    #[test]
    fn config_defaults_apply_on_deserialize() {
        let config: ChannelConfig = serde_json::from_str(
            r#"{"channel_id": "south-branch", "name": "South Branch"}"#,
        )
        .expect("deserialize");
        assert_eq!(config.sensor_type, SensorType::Radar);
        assert_eq!(config.depth_offset, 0.0);
        assert!(config.active);
        assert!(config.geometry.is_none());
        assert!(config.device_id.is_none());
    }

    #[test]
    fn ultrasonic_config_round_trips_geometry() {
        let config = ChannelConfig {
            channel_id: ChannelId::parse("east-lateral").expect("id"),
            name: "East Lateral".to_string(),
            sensor_type: SensorType::Ultrasonic,
            geometry: Some(Geometry {
                cross_section: CrossSection::Rectangle { bottom_width: 2.0 },
                slope: 0.001,
                roughness: 0.013,
                unit_factor: 1.0,
                max_depth: Some(1.8),
            }),
            depth_offset: 0.12,
            device_id: Some("esp32-007".to_string()),
            active: true,
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: ChannelConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
