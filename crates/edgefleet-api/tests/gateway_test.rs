//! Integration tests for the gateway lifecycle over HTTP.

mod common;

use axum::http::StatusCode;
use serde_json::json;

async fn register(app: &axum::Router, gateway_id: &str) {
    let (status, _) = common::post_json(
        app,
        "/api/v1/gateways",
        &json!({"gateway_id": gateway_id, "name": "A", "location": "Room1"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn install_certificate(app: &axum::Router, gateway_id: &str) {
    let (status, _) = common::ingest(
        app,
        json!({
            "type": "mqtt_status",
            "gateway_id": gateway_id,
            "payload": {
                "status": "certificate_installed",
                "certificate_info": {"status": "installed", "certificate_id": "cert-1"}
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gateway_lifecycle_round_trip() {
    let (app, containers) = common::build_test_app();

    // Register
    register(&app, "gw-1").await;
    assert_eq!(containers.started(), vec!["gw-1".to_owned()]);

    // Heartbeat keeps a fresh gateway in created
    let (status, json) = common::ingest(
        &app,
        json!({"type": "mqtt_heartbeat", "gateway_id": "gw-1", "payload": {"uptime": 5}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "created");
    assert_eq!(json["gateway"]["version"], 1);

    // Connecting without a certificate is ignored
    let (status, json) = common::post_empty(&app, "/api/v1/gateways/gw-1/connect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "created");
    assert_eq!(json["transitions"][0]["reason"], "certificate_not_installed");

    // Install the certificate and connect
    install_certificate(&app, "gw-1").await;
    let (status, json) = common::post_empty(&app, "/api/v1/gateways/gw-1/connect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "connected");
    assert_eq!(json["gateway"]["certificate_info"]["certificate_id"], "cert-1");

    let (status, json) = common::get_json(&app, "/api/v1/gateways?status=connected").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    // History lists every appended event, ignored ones included
    let (status, json) = common::get_json(&app, "/api/v1/gateways/gw-1/events").await;
    assert_eq!(status, StatusCode::OK);
    let events = json.as_array().unwrap();
    let versions: Vec<i64> = events.iter().map(|e| e["version"].as_i64().unwrap()).collect();
    assert_eq!(versions, vec![0, 1, 2, 3, 4]);
    assert_eq!(events[0]["event_type"], "gateway.created");
    assert_eq!(events[2]["event_type"], "gateway.connected");

    // Rebuilding from the log yields the stored projection
    let (_, projected) = common::get_json(&app, "/api/v1/gateways/gw-1").await;
    let (status, rebuilt) = common::post_empty(&app, "/api/v1/gateways/gw-1/rebuild").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rebuilt, projected);

    // Delete
    let (status, json) = common::delete(
        &app,
        "/api/v1/gateways/gw-1",
        Some(&json!({"reason": "decommissioned"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "deleted");
    assert_eq!(containers.stopped(), vec!["gw-1".to_owned()]);

    // Deleted is terminal
    let (status, json) = common::ingest(
        &app,
        json!({"type": "mqtt_heartbeat", "gateway_id": "gw-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "deleted");
    assert_eq!(json["transitions"][0]["reason"], "terminal_state");
}

#[tokio::test]
async fn test_create_without_id_generates_one() {
    let (app, _) = common::build_test_app();

    let (status, json) = common::post_json(
        &app,
        "/api/v1/gateways",
        &json!({"name": "A", "location": "Room1"}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let gateway_id = json["gateway"]["gateway_id"].as_str().unwrap();
    let (status, json) = common::get_json(&app, &format!("/api/v1/gateways/{gateway_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "A");
}

#[tokio::test]
async fn test_status_offline_sets_error_marker() {
    let (app, _) = common::build_test_app();
    register(&app, "gw-1").await;
    install_certificate(&app, "gw-1").await;
    common::post_empty(&app, "/api/v1/gateways/gw-1/connect").await;

    let (status, json) = common::ingest(
        &app,
        json!({"type": "mqtt_status", "gateway_id": "gw-1", "payload": {"status": "offline"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gateway"]["status"], "disconnected");
    assert_eq!(json["gateway"]["error"]["status"], "reported offline");
}

#[tokio::test]
async fn test_delete_unknown_gateway_returns_404() {
    let (app, containers) = common::build_test_app();

    let (status, json) = common::delete(&app, "/api/v1/gateways/ghost", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "aggregate_not_found");
    assert!(containers.stopped().is_empty());
}

#[tokio::test]
async fn test_events_of_unknown_gateway_returns_404() {
    let (app, _) = common::build_test_app();

    let (status, _) = common::get_json(&app, "/api/v1/gateways/ghost/events").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
