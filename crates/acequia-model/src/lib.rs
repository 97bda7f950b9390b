//! Shared domain types for the acequia canal-telemetry services.
//!
//! # Purpose
//! One place for the channel identifier, the reading record, the status
//! enumeration, physical range validation, and the channel-registry record
//! consumed by the ingestion service. Keeping these in a leaf crate lets the
//! buffer, broadcast, and service crates agree on wire and in-memory shapes
//! without depending on each other.
mod channel;
mod reading;
mod registry;

pub use channel::{ChannelId, ChannelStatus};
pub use reading::{DeviceErrorEntry, GpsCoordinates, Reading, ranges};
pub use registry::{ChannelConfig, SensorType};

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Rejections raised before a reading may enter the buffer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "channel id must be 3-50 characters, alphanumeric with hyphens/underscores only: {0:?}"
    )]
    InvalidChannelId(String),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown status {0:?}")]
    UnknownStatus(String),
}
