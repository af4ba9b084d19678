//! Integration tests for the HTTP API
//!
//! These tests drive the full router in-process:
//! - Ingest in every accepted payload shape
//! - Query endpoints and their "no data" answers
//! - Bounded history through the public surface
//! - Partially filled optional blocks and per-field stats
//! - The server-side twin walker
//! - The live-push stream handshake

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::builders::PayloadBuilder;
use common::http::{get, post_json, post_raw, test_state};
use futures::StreamExt;
use linetrace_telemetry::router;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_ping() {
    let app = router(test_state(10));
    let (status, body) = get(&app, "/api/ping").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Server is running");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_empty_store_answers() {
    let app = router(test_state(10));

    for uri in [
        "/api/telemetry/latest",
        "/api/telemetry/stats",
        "/api/telemetry/alerts",
        "/api/sensor",
        "/api/twin",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["status"], "no_data", "{}", uri);
        assert_eq!(body["message"], "No data available", "{}", uri);
    }

    // An empty history is a valid answer, not "no data"
    let (status, body) = get(&app, "/api/telemetry").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = get(&app, "/api/telemetry/export").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));

    let (_, body) = post_raw(&app, "/api/telemetry/clear", "").await;
    assert_eq!(body["cleared"], 0);
}

#[tokio::test]
async fn test_ingest_then_latest() {
    let state = test_state(10);
    let app = router(state.clone());

    let payload = PayloadBuilder::new()
        .timestamp(1_700_000_000_000)
        .sensors([1, 1, 1, 0, 0, 1, 1, 1])
        .motor(180, 175)
        .error(0.0)
        .field("wifi", json!({ "ip": "192.168.4.2", "rssi": -60 }))
        .field("sensor_binary", json!("11100111"))
        .build();

    let (status, body) = post_json(&app, "/api/telemetry", &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["received"], true);
    assert_eq!(body["timestamp"], 1_700_000_000_000i64);

    let (status, latest) = get(&app, "/api/telemetry/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["sensors"], json!([1, 1, 1, 0, 0, 1, 1, 1]));
    assert_eq!(latest["motor"]["left_speed"], 180);
    assert_eq!(latest["wifi"]["ip"], "192.168.4.2");
    assert_eq!(latest["sensor_binary"], "11100111");
    assert!(latest["server_timestamp"].is_string());
    assert_eq!(state.store.len(), 1);
}

#[tokio::test]
async fn test_missing_timestamp_is_assigned() {
    let app = router(test_state(10));
    let (_, body) = post_json(&app, "/api/telemetry", &json!({})).await;
    assert!(body["timestamp"].as_i64().unwrap() > 0);

    let (_, latest) = get(&app, "/api/telemetry/latest").await;
    assert_eq!(latest["timestamp"], body["timestamp"]);
}

#[tokio::test]
async fn test_malformed_payloads_are_rejected() {
    let state = test_state(10);
    let app = router(state.clone());

    let (status, body) = post_raw(&app, "/api/telemetry", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("JSON"));

    for payload in [
        json!([1, 2, 3]),
        json!({ "sensors": [1, 1, 1] }),
        json!({ "sensors": [1, 1, 1, 1, 1, 1, 1, 3] }),
        json!({ "motor": { "left_speed": -1, "right_speed": 0 } }),
        json!({ "motor": { "left_speed": 1.5, "right_speed": 0 } }),
        json!({ "status": "dancing" }),
    ] {
        let (status, body) = post_json(&app, "/api/telemetry", &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
        assert_eq!(body["status"], "error");
    }

    assert!(state.store.is_empty());
}

#[tokio::test]
async fn test_bounded_history_scenario() {
    let app = router(test_state(2));

    for t in 1..=3 {
        let payload = PayloadBuilder::new().timestamp(t).build();
        post_json(&app, "/api/telemetry", &payload).await;
    }

    let (_, history) = get(&app, "/api/telemetry?count=10").await;
    let timestamps: Vec<i64> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_i64().unwrap())
        .collect();
    assert_eq!(timestamps, vec![2, 3]);

    let (_, latest) = get(&app, "/api/telemetry/latest").await;
    assert_eq!(latest["timestamp"], 3);

    let (_, stats) = get(&app, "/api/telemetry/stats").await;
    assert_eq!(stats["total_records"], 2);
}

#[tokio::test]
async fn test_history_count() {
    let app = router(test_state(100));
    for t in 0..15 {
        post_json(&app, "/api/telemetry", &PayloadBuilder::new().timestamp(t).build()).await;
    }

    // Default window is 10, oldest first
    let (_, history) = get(&app, "/api/telemetry").await;
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0]["timestamp"], 5);
    assert_eq!(history[9]["timestamp"], 14);

    let (_, three) = get(&app, "/api/telemetry?count=3").await;
    assert_eq!(three.as_array().unwrap().len(), 3);

    let (_, none) = get(&app, "/api/telemetry?count=0").await;
    assert_eq!(none, json!([]));

    let (status, body) = get(&app, "/api/telemetry?count=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("query string"));
}

#[tokio::test]
async fn test_partial_blocks_are_stored() {
    let state = test_state(10);
    let app = router(state.clone());
    let sensors = json!([1, 1, 1, 0, 0, 1, 1, 1]);

    for payload in [
        json!({ "sensors": sensors, "wifi": { "rssi": -50 } }),
        json!({ "sensors": sensors, "control": { "turn": 3, "base_speed": 180 } }),
        json!({ "sensors": sensors, "motor": { "left_speed": 120 } }),
        json!({ "sensors": sensors, "wifi": { "ip": "1.2.3.4", "rssi": -50.5 } }),
    ] {
        let (status, body) = post_json(&app, "/api/telemetry", &payload).await;
        assert_eq!(status, StatusCode::OK, "{} -> {}", payload, body);
    }
    assert_eq!(state.store.len(), 4);

    let (_, history) = get(&app, "/api/telemetry").await;
    assert_eq!(history[0]["wifi"], json!({ "rssi": -50 }));
    assert_eq!(history[1]["control"], json!({ "turn": 3, "base_speed": 180 }));
    assert_eq!(history[2]["motor"], json!({ "left_speed": 120 }));
    assert_eq!(history[3]["wifi"]["rssi"], -50.5);

    let (_, stats) = get(&app, "/api/telemetry/stats").await;
    assert_eq!(stats["total_records"], 4);
    assert_eq!(stats["error_samples"], 0);
    assert_eq!(stats["max_left_speed"], 120.0);
}

#[tokio::test]
async fn test_stats_with_one_sided_motor() {
    let app = router(test_state(10));
    post_json(&app, "/api/telemetry", &json!({ "motor": { "left_speed": 300 } })).await;
    post_json(&app, "/api/telemetry", &PayloadBuilder::new().motor(120, 80).build()).await;

    let (status, stats) = get(&app, "/api/telemetry/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["max_left_speed"], 300.0);
    assert_eq!(stats["min_left_speed"], 120.0);
    assert_eq!(stats["max_right_speed"], 80.0);
    assert_eq!(stats["min_right_speed"], 80.0);
}

#[tokio::test]
async fn test_stats_skip_missing_fields() {
    let app = router(test_state(10));
    let payloads = [
        PayloadBuilder::new().motor(100, 200).error(2.0).build(),
        PayloadBuilder::new().motor(50, 250).build(),
        PayloadBuilder::new().error(-4.0).build(),
    ];
    for payload in &payloads {
        post_json(&app, "/api/telemetry", payload).await;
    }

    let (status, stats) = get(&app, "/api/telemetry/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_records"], 3);
    assert_eq!(stats["avg_error"], -1.0);
    assert_eq!(stats["max_left_speed"], 100.0);
    assert_eq!(stats["min_left_speed"], 50.0);
    assert_eq!(stats["max_right_speed"], 250.0);
    assert_eq!(stats["min_right_speed"], 200.0);
}

#[tokio::test]
async fn test_export_and_clear() {
    let state = test_state(10);
    let app = router(state.clone());
    for t in 0..4 {
        post_json(&app, "/api/telemetry", &PayloadBuilder::new().timestamp(t).build()).await;
    }

    let (_, export) = get(&app, "/api/telemetry/export").await;
    assert_eq!(export["status"], "success");
    assert_eq!(export["count"], 4);
    assert_eq!(export["data"].as_array().unwrap().len(), 4);
    let filename = export["filename"].as_str().unwrap();
    assert!(filename.starts_with("telemetry_"));
    assert!(filename.ends_with(".json"));
    assert!(!filename.contains(':'));

    let (status, cleared) = post_raw(&app, "/api/telemetry/clear", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["status"], "success");
    assert_eq!(cleared["cleared"], 4);
    assert!(state.store.is_empty());

    let (status, _) = get(&app, "/api/telemetry/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_legacy_sensor_endpoint() {
    let app = router(test_state(10));
    let legacy = json!({
        "sensors": { "values": [0, 1, 1, 1, 1, 1, 1, 1], "lineDetected": true },
        "motors": {
            "left": { "speed": 0, "direction": "stop" },
            "right": { "speed": 0, "direction": "stop" }
        },
        "error": 7,
        "status": "running",
        "battery": 15
    });

    let (status, body) = post_json(&app, "/api/sensor", &legacy).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Data received");
    assert!(body["timestamp"].is_string());

    // Stored in canonical shape
    let (_, latest) = get(&app, "/api/telemetry/latest").await;
    assert_eq!(latest["sensors"], json!([0, 1, 1, 1, 1, 1, 1, 1]));
    assert_eq!(latest["motor"]["left_speed"], 0);
    assert_eq!(latest["motor"]["left_direction"], "stop");
    assert_eq!(latest["control"]["error"], 7.0);
    assert!(latest.get("motors").is_none());

    let (_, sensor) = get(&app, "/api/sensor").await;
    assert_eq!(sensor["status"], "ok");
    assert_eq!(sensor["data"]["status"], "running");

    let (_, alerts) = get(&app, "/api/telemetry/alerts").await;
    let titles: Vec<&str> = alerts["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Motors stopped", "Low battery"]);
    assert_eq!(alerts["count"], 2);
}

#[tokio::test]
async fn test_twin_frame() {
    let app = router(test_state(10));
    let payload = PayloadBuilder::new()
        .sensors([0, 1, 1, 1, 1, 1, 1, 1])
        .build();
    post_json(&app, "/api/telemetry", &payload).await;

    let (status, frame) = get(&app, "/api/twin?progress=0.5").await;
    assert_eq!(status, StatusCode::OK);
    common::assert_float_eq(frame["progress"].as_f64().unwrap(), 0.5, 1e-12);
    // Middle of the top edge of the default track
    common::assert_float_eq(frame["pose"]["x"].as_f64().unwrap(), 200.0, 1e-6);
    common::assert_float_eq(frame["pose"]["y"].as_f64().unwrap(), 45.0, 1e-6);
    assert_eq!(frame["deviation"]["value"], 7.0);
    assert_eq!(frame["offset"], 28.0);
    assert_eq!(frame["marker_screen"]["x"], 172.0);
    assert_eq!(frame["sensors"][0], true);

    let (status, body) = get(&app, "/api/twin?progress=halfway").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_twin_walker_advances_per_request() {
    let app = router(test_state(10));
    post_json(&app, "/api/telemetry", &PayloadBuilder::new().build()).await;

    let (_, first) = get(&app, "/api/twin").await;
    let (_, second) = get(&app, "/api/twin").await;
    let first_progress = first["progress"].as_f64().unwrap();
    let second_progress = second["progress"].as_f64().unwrap();
    assert!(second_progress > first_progress);
    assert_ne!(first["pose"], second["pose"]);

    // An explicit progress does not move the shared walker
    get(&app, "/api/twin?progress=0.5").await;
    let (_, third) = get(&app, "/api/twin").await;
    common::assert_float_eq(
        third["progress"].as_f64().unwrap() - second_progress,
        second_progress - first_progress,
        1e-12,
    );
}

#[tokio::test]
async fn test_stream_sends_connected_first() {
    let app = router(test_state(10));
    let request = Request::builder()
        .uri("/api/stream")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = tokio::time::timeout(common::test_timeout(), body.next())
        .await
        .expect("first event arrives without waiting for a poll")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.starts_with("data: "));
    assert!(text.contains("\"type\":\"connected\""));
    assert!(text.contains("Stream connected"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_respects_capacity() {
    let state = test_state(50);
    let app = router(state.clone());

    let mut tasks = Vec::new();
    for worker in 0..8i64 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..20i64 {
                let payload = PayloadBuilder::new().timestamp(worker * 1000 + i).build();
                let (status, _) = post_json(&app, "/api/telemetry", &payload).await;
                assert_eq!(status, StatusCode::OK);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(state.store.len(), 50);
    let (_, history) = get(&app, "/api/telemetry?count=500").await;
    assert_eq!(history.as_array().unwrap().len(), 50);
}
