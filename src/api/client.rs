//! HTTP client for the traffic server.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::api::error::ApiError;
use crate::api::types::{
    Envelope, ErrorDetail, Health, IntersectionInfo, JourneyStarted, RouteChangeResponse,
    RouteResult, TrafficTable,
};
use crate::config::ApiConfig;
use crate::journey::{JourneyId, RouteId};
use crate::negotiation::DecisionSink;
use crate::traffic::{IntersectionId, QueryError, TrafficSource};

/// Client for the traffic server's REST endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let parsed =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Server liveness.
    pub async fn health(&self) -> Result<Health, ApiError> {
        self.send(self.client.get(format!("{}/api/health", self.base_url)))
            .await
    }

    /// All intersections with their latest traffic.
    pub async fn intersections(&self) -> Result<Vec<IntersectionInfo>, ApiError> {
        self.send_enveloped(self.client.get(format!("{}/api/intersections", self.base_url)))
            .await
    }

    /// Latest traffic for every intersection.
    pub async fn traffic_all(&self) -> Result<TrafficTable, ApiError> {
        self.send_enveloped(self.client.get(format!("{}/api/traffic/all", self.base_url)))
            .await
    }

    /// Shortest-distance route between two intersections.
    pub async fn shortest_route(
        &self,
        source: &IntersectionId,
        destination: &IntersectionId,
    ) -> Result<RouteResult, ApiError> {
        let request = self
            .client
            .post(format!("{}/api/routes/shortest", self.base_url))
            .query(&[("source", source.as_str()), ("destination", destination.as_str())]);
        self.send_enveloped(request).await
    }

    /// Fastest route, optionally steering around congestion.
    pub async fn fastest_route(
        &self,
        source: &IntersectionId,
        destination: &IntersectionId,
        avoid_congestion: bool,
    ) -> Result<RouteResult, ApiError> {
        let request = self
            .client
            .post(format!("{}/api/routes/fastest", self.base_url))
            .query(&[("source", source.as_str()), ("destination", destination.as_str())])
            .query(&[("avoid_congestion", avoid_congestion)]);
        self.send_enveloped(request).await
    }

    /// Register a journey along `path` for a computed route.
    pub async fn start_journey(
        &self,
        route_id: RouteId,
        path: &[IntersectionId],
    ) -> Result<JourneyStarted, ApiError> {
        let request = self
            .client
            .post(format!("{}/api/journey/start", self.base_url))
            .query(&[("route_id", route_id.0)])
            .json(&path_body(path));

        let started: JourneyStarted = self.send(request).await?;
        if !started.success {
            return Err(ApiError::Rejected(format!("journey for route {} not started", route_id)));
        }
        Ok(started)
    }

    /// Report the user's answer to a suggested route change.
    pub async fn respond_route_change(
        &self,
        journey_id: JourneyId,
        accept: bool,
    ) -> Result<RouteChangeResponse, ApiError> {
        let request = self
            .client
            .post(format!(
                "{}/api/journey/{}/respond-route-change",
                self.base_url, journey_id
            ))
            .query(&[("accept", accept)]);

        let response: RouteChangeResponse = self.send(request).await?;
        if !response.success {
            return Err(ApiError::Rejected(format!(
                "route change for journey {} not acknowledged",
                journey_id
            )));
        }
        Ok(response)
    }

    async fn send_enveloped<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send(request).await?;
        envelope.into_data()
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let body = match serde_json::from_str::<ErrorDetail>(&text) {
                Ok(detail) => detail.detail,
                Err(_) => text,
            };
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// The server expects integer ids in the journey path; ids that are not
/// numeric are sent as strings.
fn path_body(path: &[IntersectionId]) -> Vec<Value> {
    path.iter()
        .map(|id| match id.as_str().parse::<u64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::from(id.as_str()),
        })
        .collect()
}

#[async_trait]
impl TrafficSource for ApiClient {
    async fn congestion(
        &self,
        path: &[IntersectionId],
    ) -> Result<HashMap<IntersectionId, f64>, QueryError> {
        let table = self.traffic_all().await?;
        Ok(path
            .iter()
            .filter_map(|id| {
                let update = table.get(id)?;
                let snapshot = update.apply_to(None);
                Some((id.clone(), snapshot.congestion_percentage))
            })
            .collect())
    }
}

#[async_trait]
impl DecisionSink for ApiClient {
    async fn submit(&self, journey_id: JourneyId, accept: bool) -> Result<(), ApiError> {
        self.respond_route_change(journey_id, accept).await.map(|_| ())
    }
}
