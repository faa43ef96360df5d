//! HTTP API tests against a live server

use reqwest::StatusCode;
use serde_json::{json, Value};

use shared::{ChannelSnapshot, ChannelStatus};

mod common;
use common::fixtures;
use common::helpers::{wait_for_condition, TestServer};

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;

    let body: Value = reqwest::get(server.url("/health")).await.unwrap().json().await.unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["channels"], 1);
    assert_eq!(body["connections"], 0);
    server.stop().await;
}

#[tokio::test]
async fn test_list_channels_returns_snapshot() {
    let server = TestServer::start(json!([{"id": 2, "name": "two"}, {"id": 1, "name": "one"}])).await;

    let response = reqwest::get(server.url("/api/channels")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(
        body,
        json!([
            {"id": 1, "name": "one", "status": "inactive", "pid": null},
            {"id": 2, "name": "two", "status": "inactive", "pid": null}
        ])
    );
    server.stop().await;
}

#[tokio::test]
async fn test_start_stop_restart_round_trip() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;
    let client = reqwest::Client::new();

    let response = client.post(server.url("/api/start/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(server.status_of(1), ChannelStatus::Listening);

    let snapshot: Vec<ChannelSnapshot> = client.get(server.url("/api/channels")).send().await.unwrap().json().await.unwrap();
    let first_pid = snapshot[0].pid;
    assert!(first_pid.is_some());

    let response = client.post(server.url("/api/restart/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: Vec<ChannelSnapshot> = client.get(server.url("/api/channels")).send().await.unwrap().json().await.unwrap();
    assert_eq!(snapshot[0].status, ChannelStatus::Listening);
    assert_ne!(snapshot[0].pid, first_pid);

    let response = client.post(server.url("/api/stop/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.status_of(1), ChannelStatus::Inactive);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_channel_is_not_found() {
    let server = TestServer::start(json!([])).await;
    let client = reqwest::Client::new();

    let response = client.post(server.url("/api/start/42")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["detail"], "Channel not found: 42");

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_channel_id_is_bad_request() {
    let server = TestServer::start(json!([])).await;
    let client = reqwest::Client::new();

    for raw in ["0", "abc"] {
        let response = client.post(server.url(&format!("/api/stop/{}", raw))).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "id {:?}", raw);
    }
    server.stop().await;
}

#[tokio::test]
async fn test_create_channel_persists_and_starts() {
    let server = TestServer::start(json!([{"id": 1, "name": "one", "enabled": false}])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/channels"))
        .json(&json!({"name": "two", "mode": "listener", "local_port": 9200}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "success", "id": 2}));
    assert_eq!(server.status_of(2), ChannelStatus::Listening);

    let stored: Value =
        serde_json::from_str(&std::fs::read_to_string(server.dir.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(stored["channels"][1]["name"], "two");
    assert_eq!(stored["channels"][1]["local_port"], 9200);

    server.stop().await;
}

#[tokio::test]
async fn test_create_with_blank_name_is_rejected() {
    let server = TestServer::start(json!([])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/channels"))
        .json(&json!({"name": "   ", "mode": "listener"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["detail"].as_str().unwrap().contains("needs a name"));
    assert!(server.fleet.channel_ids().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn test_create_caller_without_remote_is_rejected() {
    let server = TestServer::start(json!([])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/channels"))
        .json(&json!({"name": "remote", "mode": "caller"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.fleet.channel_ids().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn test_update_channel_restarts_with_new_record() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;
    let client = reqwest::Client::new();
    client.post(server.url("/api/start/1")).send().await.unwrap();

    let response = client
        .put(server.url("/api/channels/1"))
        .json(&json!({"name": "uno", "mode": "caller", "remote_address": "10.0.0.5", "remote_port": 5000}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot: Vec<ChannelSnapshot> = client.get(server.url("/api/channels")).send().await.unwrap().json().await.unwrap();
    assert_eq!(snapshot[0].name, "uno");
    assert_eq!(snapshot[0].status, ChannelStatus::Listening);

    let log = server.dir.path().join("logs").join("channel_1_uno.log");
    assert!(wait_for_condition(|| std::fs::read_to_string(&log).map(|l| l.contains("srt://10.0.0.5:5000?mode=caller")).unwrap_or(false), 2000).await);

    server.stop().await;
}

#[tokio::test]
async fn test_index_and_static_assets_are_served() {
    let server = TestServer::start(json!([])).await;

    let index = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();
    assert_eq!(index, fixtures::INDEX_HTML);

    let asset = reqwest::get(server.url("/static/js/app.js")).await.unwrap();
    assert_eq!(asset.status(), StatusCode::OK);
    assert_eq!(asset.text().await.unwrap(), fixtures::APP_JS);

    let missing = reqwest::get(server.url("/static/missing.css")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}
