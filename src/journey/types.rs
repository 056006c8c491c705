//! Journey types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traffic::IntersectionId;

/// Identifier of a journey, distinct from the route that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JourneyId(pub u64);

impl std::fmt::Display for JourneyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a computed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u64);

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JourneyError {
    #[error("journey {0} has an empty path")]
    EmptyPath(JourneyId),
}

/// The journey currently being travelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJourney {
    pub journey_id: JourneyId,
    pub route_id: RouteId,
    path: Vec<IntersectionId>,
}

impl ActiveJourney {
    /// Build a journey. The path must contain at least one intersection;
    /// repeated intersections are allowed.
    pub fn new(
        journey_id: JourneyId,
        route_id: RouteId,
        path: Vec<IntersectionId>,
    ) -> Result<Self, JourneyError> {
        if path.is_empty() {
            return Err(JourneyError::EmptyPath(journey_id));
        }
        Ok(Self {
            journey_id,
            route_id,
            path,
        })
    }

    pub fn path(&self) -> &[IntersectionId] {
        &self.path
    }

    pub fn origin(&self) -> &IntersectionId {
        &self.path[0]
    }

    pub fn destination(&self) -> &IntersectionId {
        &self.path[self.path.len() - 1]
    }
}
