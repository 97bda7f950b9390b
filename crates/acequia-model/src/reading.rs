use crate::{ChannelId, ChannelStatus, SensorType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One telemetry sample plus derived metrics, timestamped.
///
/// Immutable once built: the ingestion endpoint validates every field
/// against [`ranges`] before construction, so a `Reading` held by the buffer
/// or delivered to a stream subscriber is always physically plausible.
/// The hydraulic fields (`area`, `hydraulic_radius`, `wetted_perimeter`)
/// are present only when the value was derived through the Manning
/// calculator rather than reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    pub device_id: String,
    pub sensor_type: SensorType,
    pub status: ChannelStatus,
    /// Flow rate `Q` (m³/s), always present (0 for a dry channel).
    pub flow_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydraulic_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wetted_perimeter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoordinates>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DeviceErrorEntry>,
    /// Event time: device-supplied, or server-assigned at receipt.
    pub timestamp: DateTime<Utc>,
    /// Server receipt time.
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Device-reported fault entry carried alongside a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeviceErrorEntry {
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Physically valid ranges for device-supplied fields.
///
/// A reading outside any of these ranges is rejected before it can enter
/// the buffer. Bounds follow the deployed sensor fleet's envelope.
pub mod ranges {
    use crate::ValidationError;

    pub const FLOW_RATE: (f64, f64) = (0.0, 1000.0);
    pub const VELOCITY: (f64, f64) = (0.0, 50.0);
    pub const DISCHARGE: (f64, f64) = (0.0, 10_000.0);
    pub const DEPTH: (f64, f64) = (0.0, f64::MAX);
    pub const WATER_LEVEL: (f64, f64) = (0.0, f64::MAX);
    pub const TEMPERATURE: (f64, f64) = (-50.0, 100.0);
    pub const PH: (f64, f64) = (0.0, 14.0);
    pub const TURBIDITY: (f64, f64) = (0.0, f64::MAX);
    pub const BATTERY_LEVEL: (f64, f64) = (0.0, 100.0);
    pub const SIGNAL_STRENGTH: (f64, f64) = (-120.0, 0.0);
    pub const LATITUDE: (f64, f64) = (-90.0, 90.0);
    pub const LONGITUDE: (f64, f64) = (-180.0, 180.0);

    /// Check one value against its range; `None` passes trivially.
    pub fn check_opt(
        field: &'static str,
        value: Option<f64>,
        (min, max): (f64, f64),
    ) -> Result<(), ValidationError> {
        match value {
            Some(value) => check(field, value, (min, max)),
            None => Ok(()),
        }
    }

    pub fn check(
        field: &'static str,
        value: f64,
        (min, max): (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() || value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_bounds_and_rejects_outside() {
        assert!(ranges::check("ph", 0.0, ranges::PH).is_ok());
        assert!(ranges::check("ph", 14.0, ranges::PH).is_ok());
        assert!(ranges::check("ph", 14.1, ranges::PH).is_err());
        assert!(ranges::check("ph", -0.1, ranges::PH).is_err());
        assert!(ranges::check("ph", f64::NAN, ranges::PH).is_err());
    }

    #[test]
    fn absent_optional_values_pass() {
        assert!(ranges::check_opt("battery_level", None, ranges::BATTERY_LEVEL).is_ok());
        assert!(ranges::check_opt("battery_level", Some(101.0), ranges::BATTERY_LEVEL).is_err());
    }

    #[test]
    fn reading_serialization_omits_absent_fields() {
        let reading = Reading {
            channel_id: ChannelId::parse("west-main").expect("id"),
            device_id: "esp32-001".to_string(),
            sensor_type: SensorType::Radar,
            status: ChannelStatus::Flowing,
            flow_rate: 12.5,
            velocity: None,
            discharge: None,
            water_level: None,
            depth: None,
            area: None,
            hydraulic_radius: None,
            wetted_perimeter: None,
            temperature: Some(18.0),
            ph: None,
            turbidity: None,
            battery_level: None,
            signal_strength: None,
            gps: None,
            errors: Vec::new(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
        };
        let json = serde_json::to_value(&reading).expect("serialize");
        assert_eq!(json["status"], "FLOWING");
        assert_eq!(json["temperature"], 18.0);
        assert!(json.get("velocity").is_none());
        assert!(json.get("errors").is_none());
    }
}
