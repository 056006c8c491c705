//! Traffic queries used by the journey monitor.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::api::ApiError;
use crate::traffic::store::TrafficStateStore;
use crate::traffic::types::IntersectionId;

/// Errors from a traffic query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The traffic API could not be reached or answered badly.
    #[error("traffic query failed: {0}")]
    Api(#[from] ApiError),

    /// The source is not able to answer right now.
    #[error("traffic source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can report current congestion for a set of intersections.
///
/// Implementations return readings only for intersections they know about;
/// callers treat missing entries as 0% congestion.
#[async_trait]
pub trait TrafficSource: Send + Sync {
    async fn congestion(
        &self,
        path: &[IntersectionId],
    ) -> Result<HashMap<IntersectionId, f64>, QueryError>;
}

#[async_trait]
impl TrafficSource for TrafficStateStore {
    async fn congestion(
        &self,
        path: &[IntersectionId],
    ) -> Result<HashMap<IntersectionId, f64>, QueryError> {
        Ok(path
            .iter()
            .filter_map(|id| self.get(id).map(|snap| (id.clone(), snap.congestion_percentage)))
            .collect())
    }
}
