//! Request and response bodies of the traffic HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::error::ApiError;
use crate::journey::{JourneyId, RouteId};
use crate::traffic::{CongestionStatus, IntersectionId, SnapshotUpdate};

/// The `{success, data}` wrapper most endpoints use.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.error.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ApiError::Rejected("response has no data".to_string()))
    }
}

/// `GET /api/health`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// One entry of `GET /api/intersections`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntersectionInfo {
    pub id: IntersectionId,
    pub name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub road_width: Option<f64>,
    #[serde(default)]
    pub vehicle_count: u32,
    #[serde(default)]
    pub congestion: f64,
    #[serde(default = "unknown_status")]
    pub status: CongestionStatus,
}

fn unknown_status() -> CongestionStatus {
    CongestionStatus::Unknown
}

/// `GET /api/traffic/all`, keyed by intersection.
pub type TrafficTable = HashMap<IntersectionId, SnapshotUpdate>;

/// A computed route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteResult {
    pub route_id: RouteId,
    #[serde(default)]
    pub route_type: String,
    pub path: Vec<IntersectionId>,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub estimated_time_minutes: u32,
    /// Intersection names, in path order.
    #[serde(default)]
    pub intersections: Vec<String>,
}

/// Server-side record of a started journey.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JourneyRecord {
    pub route_id: RouteId,
    pub path: Vec<IntersectionId>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `POST /api/journey/start`
#[derive(Debug, Clone, Deserialize)]
pub struct JourneyStarted {
    #[serde(default = "default_success")]
    pub success: bool,
    pub journey_id: JourneyId,
    pub data: JourneyRecord,
}

/// `POST /api/journey/{id}/respond-route-change`
#[derive(Debug, Clone, Deserialize)]
pub struct RouteChangeResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    /// `accepted` or `rejected`.
    pub response: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Error body FastAPI-style servers return with a non-2xx status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}
