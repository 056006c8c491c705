//! HTTP client tests against a programmable backend.

use traffic_sync::api::{ApiClient, ApiError};
use traffic_sync::config::ApiConfig;
use traffic_sync::journey::{JourneyId, RouteId};
use traffic_sync::negotiation::DecisionSink;
use traffic_sync::traffic::{IntersectionId, TrafficSource};

mod common;
use common::start_programmable_backend;

fn client(addr: std::net::SocketAddr) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: format!("http://{}", addr),
        request_timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_fastest_route_query() {
    let (addr, requests) = start_programmable_backend(|_req| async {
        (
            200,
            r#"{"success":true,"data":{"success":true,"route_type":"fastest_congestion_aware",
                "path":[1,3,6],"distance_km":4.2,"estimated_time_minutes":11,
                "intersections":["A","C","F"],"route_id":31}}"#
                .to_string(),
        )
    })
    .await;

    let route = client(addr)
        .fastest_route(&IntersectionId::from(1), &IntersectionId::from(6), true)
        .await
        .unwrap();

    assert_eq!(route.route_id, RouteId(31));
    assert_eq!(route.path, vec![IntersectionId::from(1), IntersectionId::from(3), IntersectionId::from(6)]);
    assert_eq!(route.estimated_time_minutes, 11);

    let requests = requests.lock().unwrap();
    assert_eq!(
        requests[0].request_line,
        "POST /api/routes/fastest?source=1&destination=6&avoid_congestion=true HTTP/1.1"
    );
}

#[tokio::test]
async fn test_start_journey_sends_path_body() {
    let (addr, requests) = start_programmable_backend(|_req| async {
        (
            200,
            r#"{"success":true,"journey_id":31,
                "data":{"route_id":31,"path":[1,3,6],"start_time":"2024-05-01T08:00:00","status":"in_progress"}}"#
                .to_string(),
        )
    })
    .await;

    let path = vec![IntersectionId::from(1), IntersectionId::from(3), IntersectionId::from(6)];
    let started = client(addr).start_journey(RouteId(31), &path).await.unwrap();
    assert_eq!(started.journey_id, JourneyId(31));

    let requests = requests.lock().unwrap();
    assert_eq!(requests[0].request_line, "POST /api/journey/start?route_id=31 HTTP/1.1");
    assert_eq!(requests[0].body, "[1,3,6]");
}

#[tokio::test]
async fn test_route_change_not_pending_is_status_error() {
    let (addr, _requests) = start_programmable_backend(|_req| async {
        (404, r#"{"detail":"No pending route change"}"#.to_string())
    })
    .await;

    let err = client(addr)
        .respond_route_change(JourneyId(4), true)
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "No pending route change");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_decision_sink_posts_answer() {
    let (addr, requests) = start_programmable_backend(|_req| async {
        (200, r#"{"success":true,"response":"rejected","data":{}}"#.to_string())
    })
    .await;

    let client = client(addr);
    let sink: &dyn DecisionSink = &client;
    sink.submit(JourneyId(12), false).await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(
        requests[0].request_line,
        "POST /api/journey/12/respond-route-change?accept=false HTTP/1.1"
    );
}

#[tokio::test]
async fn test_traffic_source_reads_path_only() {
    let (addr, _requests) = start_programmable_backend(|_req| async {
        (
            200,
            r#"{"success":true,"timestamp":"2024-05-01T08:00:00","data":{
                "1":{"id":1,"vehicle_count":40,"congestion_percentage":91.0,"congestion":91.0,"status":"high"},
                "2":{"id":2,"vehicle_count":5,"congestion_percentage":12.0,"congestion":12.0,"status":"low"},
                "3":{"id":3,"vehicle_count":9,"congestion_percentage":140.0,"congestion":140.0,"status":"high"}}}"#
                .to_string(),
        )
    })
    .await;

    let path = vec![IntersectionId::from(1), IntersectionId::from(3), IntersectionId::from(8)];
    let readings = client(addr).congestion(&path).await.unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[&IntersectionId::from(1)], 91.0);
    // Out-of-range readings are clamped.
    assert_eq!(readings[&IntersectionId::from(3)], 100.0);
}

#[tokio::test]
async fn test_server_error_surfaces() {
    let (addr, _requests) =
        start_programmable_backend(|_req| async { (503, "upstream down".to_string()) }).await;

    let err = client(addr).intersections().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}
