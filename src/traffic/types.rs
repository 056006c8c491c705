//! Traffic snapshot types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Congestion at or above this percentage is reported as `high` by the server.
const HIGH_CONGESTION: f64 = 80.0;
/// Congestion at or above this percentage is reported as `medium` by the server.
const MEDIUM_CONGESTION: f64 = 50.0;

/// Identifier of an intersection.
///
/// The server keys intersections by integer, but JSON object keys always
/// arrive as strings, so both `1` and `"1"` decode to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IntersectionId(String);

impl IntersectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for IntersectionId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for IntersectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for IntersectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for IntersectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => Self(id),
            Raw::Number(id) => Self(id.to_string()),
        })
    }
}

/// Congestion classification attached to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionStatus {
    Low,
    Medium,
    High,
    Critical,
    /// A status string this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl CongestionStatus {
    /// Classify a congestion percentage the way the traffic server does.
    ///
    /// The server never emits `critical` from its own rule; it only arrives
    /// explicitly on the wire.
    pub fn from_percentage(congestion: f64) -> Self {
        if congestion >= HIGH_CONGESTION {
            CongestionStatus::High
        } else if congestion >= MEDIUM_CONGESTION {
            CongestionStatus::Medium
        } else {
            CongestionStatus::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionStatus::Low => "low",
            CongestionStatus::Medium => "medium",
            CongestionStatus::High => "high",
            CongestionStatus::Critical => "critical",
            CongestionStatus::Unknown => "unknown",
        }
    }
}

/// Latest known traffic state of one intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub vehicle_count: u32,
    /// Always within `[0, 100]`.
    pub congestion_percentage: f64,
    pub status: CongestionStatus,
}

impl Default for TrafficSnapshot {
    fn default() -> Self {
        Self {
            vehicle_count: 0,
            congestion_percentage: 0.0,
            status: CongestionStatus::Low,
        }
    }
}

/// Wire form of a snapshot; every field may be absent.
///
/// Extra fields the server sends alongside (name, coordinates, timestamp)
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotUpdate {
    #[serde(default)]
    pub vehicle_count: Option<u32>,
    #[serde(default)]
    pub congestion_percentage: Option<f64>,
    #[serde(default)]
    pub status: Option<CongestionStatus>,
}

impl SnapshotUpdate {
    /// Merge this update over `base`, producing the next snapshot.
    ///
    /// Fields missing from the update keep their previous value. When the
    /// status is missing but congestion changed, the status is re-derived.
    pub fn apply_to(&self, base: Option<&TrafficSnapshot>) -> TrafficSnapshot {
        let previous = base.cloned().unwrap_or_default();

        let congestion_percentage = match self.congestion_percentage {
            Some(value) => clamp_percentage(value),
            None => previous.congestion_percentage,
        };

        let status = match (self.status, self.congestion_percentage) {
            (Some(status), _) => status,
            (None, Some(_)) => CongestionStatus::from_percentage(congestion_percentage),
            (None, None) if base.is_some() => previous.status,
            (None, None) => CongestionStatus::from_percentage(congestion_percentage),
        };

        TrafficSnapshot {
            vehicle_count: self.vehicle_count.unwrap_or(previous.vehicle_count),
            congestion_percentage,
            status,
        }
    }
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!("Congestion percentage is NaN, treating as 0");
        return 0.0;
    }
    if !(0.0..=100.0).contains(&value) {
        tracing::warn!(congestion = value, "Congestion percentage out of range, clamping");
    }
    value.clamp(0.0, 100.0)
}
