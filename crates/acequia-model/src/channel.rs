use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

const CHANNEL_ID_MIN_LEN: usize = 3;
const CHANNEL_ID_MAX_LEN: usize = 50;

/// Stable key identifying one monitored canal.
///
/// Normalized to lowercase on parse; accepted characters after normalization
/// are `a-z`, `0-9`, `-`, and `_`, with a length of 3-50. Every buffer,
/// broadcast, and subscription operation is keyed by this type, so invalid
/// identifiers are rejected at the edge and never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    pub fn parse(input: &str) -> crate::Result<Self> {
        let normalized = input.trim().to_lowercase();
        let len = normalized.chars().count();
        if len < CHANNEL_ID_MIN_LEN || len > CHANNEL_ID_MAX_LEN {
            return Err(ValidationError::InvalidChannelId(input.to_string()));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidChannelId(input.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ValidationError;

    fn from_str(input: &str) -> crate::Result<Self> {
        Self::parse(input)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ValidationError;

    fn try_from(input: String) -> crate::Result<Self> {
        Self::parse(&input)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

/// Operational status reported with every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Flowing,
    Stopped,
    LowFlow,
    HighFlow,
    Blocked,
    Error,
}

impl ChannelStatus {
    /// Derive a status from flow rate when the device did not supply one.
    ///
    /// Thresholds are ascending: exactly zero is `Stopped`, below `low` is
    /// `LowFlow`, above `high` is `HighFlow`, anything between is `Flowing`.
    pub fn from_flow_rate(flow_rate: f64, low: f64, high: f64) -> Self {
        if flow_rate == 0.0 {
            Self::Stopped
        } else if flow_rate < low {
            Self::LowFlow
        } else if flow_rate > high {
            Self::HighFlow
        } else {
            Self::Flowing
        }
    }

    /// Parse the wire form, tolerating case and surrounding whitespace.
    pub fn parse(input: &str) -> crate::Result<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "FLOWING" => Ok(Self::Flowing),
            "STOPPED" => Ok(Self::Stopped),
            "LOW_FLOW" => Ok(Self::LowFlow),
            "HIGH_FLOW" => Ok(Self::HighFlow),
            "BLOCKED" => Ok(Self::Blocked),
            "ERROR" => Ok(Self::Error),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }

    /// Statuses that warrant an operator alert in the ingestion response.
    pub fn is_alerting(self) -> bool {
        matches!(self, Self::HighFlow | Self::Blocked | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowing => "FLOWING",
            Self::Stopped => "STOPPED",
            Self::LowFlow => "LOW_FLOW",
            Self::HighFlow => "HIGH_FLOW",
            Self::Blocked => "BLOCKED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_normalizes_case_and_whitespace() {
        let id = ChannelId::parse("  North-Main_04 ").expect("valid id");
        assert_eq!(id.as_str(), "north-main_04");
    }

    #[test]
    fn channel_id_rejects_bad_lengths_and_charsets() {
        assert!(ChannelId::parse("ab").is_err());
        assert!(ChannelId::parse(&"x".repeat(51)).is_err());
        assert!(ChannelId::parse("north canal").is_err());
        assert!(ChannelId::parse("north.canal").is_err());
        assert!(ChannelId::parse("").is_err());
    }

    #[test]
    fn channel_id_deserializes_with_validation() {
        let ok: ChannelId = serde_json::from_str("\"East-Lateral\"").expect("valid");
        assert_eq!(ok.as_str(), "east-lateral");
        let err = serde_json::from_str::<ChannelId>("\"no spaces allowed\"");
        assert!(err.is_err());
    }

    #[test]
    fn status_wire_form_is_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ChannelStatus::LowFlow).expect("serialize"),
            "\"LOW_FLOW\""
        );
        let back: ChannelStatus = serde_json::from_str("\"HIGH_FLOW\"").expect("deserialize");
        assert_eq!(back, ChannelStatus::HighFlow);
    }

    #[test]
    fn status_parse_tolerates_case_and_rejects_unknowns() {
        assert_eq!(
            ChannelStatus::parse(" low_flow ").expect("status"),
            ChannelStatus::LowFlow
        );
        assert!(matches!(
            ChannelStatus::parse("OVERFLOWING"),
            Err(ValidationError::UnknownStatus(_))
        ));
    }

    #[test]
    fn status_from_flow_rate_uses_ascending_thresholds() {
        assert_eq!(
            ChannelStatus::from_flow_rate(0.0, 2.0, 50.0),
            ChannelStatus::Stopped
        );
        assert_eq!(
            ChannelStatus::from_flow_rate(1.5, 2.0, 50.0),
            ChannelStatus::LowFlow
        );
        assert_eq!(
            ChannelStatus::from_flow_rate(10.0, 2.0, 50.0),
            ChannelStatus::Flowing
        );
        assert_eq!(
            ChannelStatus::from_flow_rate(50.0, 2.0, 50.0),
            ChannelStatus::Flowing
        );
        assert_eq!(
            ChannelStatus::from_flow_rate(51.0, 2.0, 50.0),
            ChannelStatus::HighFlow
        );
    }
}
