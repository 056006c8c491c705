//! Where resolved decisions are reported.

use async_trait::async_trait;

use crate::api::ApiError;
use crate::journey::JourneyId;

/// Remote acknowledgement of a reroute decision.
///
/// Best-effort: the local outcome stands whatever this returns.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn submit(&self, journey_id: JourneyId, accept: bool) -> Result<(), ApiError>;
}
