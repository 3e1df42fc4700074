use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pitwall_core::logic::collaborators::fake::FakeTracker;
use pitwall_core::logic::model::{AutoScorer, ThresholdConfig};
use pitwall_core::logic::storage::{EncryptedCredentialStore, MemoryStore, StateStore};
use pitwall_core::{Collaborators, Orchestrator, PipelineConfig, SafetyConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;

fn test_state(tracker: Arc<FakeTracker>) -> AppState {
    let data_dir = tempfile::tempdir().unwrap().keep();
    let pipeline_config = PipelineConfig {
        collaborator_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(10),
        ..PipelineConfig::default()
    };
    let config = config::Config {
        port: 0,
        environment: "test".to_string(),
        data_dir,
        pipeline: pipeline_config.clone(),
    };

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let credentials = Arc::new(EncryptedCredentialStore::new(store.clone(), "test-secret"));
    let pipeline = Orchestrator::new(
        &pipeline_config,
        store,
        credentials,
        Collaborators::offline(tracker),
        Arc::new(SafetyConfig::default()),
    );

    AppState {
        pipeline: Arc::new(pipeline),
        scorer: Arc::new(AutoScorer::new(None, ThresholdConfig::default())),
        monitors: Arc::new(MonitorControl::default()),
        config,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = create_router(test_state(Arc::new(FakeTracker::default())));
    let (status, body) = call(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scorer"]["model_loaded"], false);
    assert_eq!(body["notifications"]["failed"], 0);
}

#[tokio::test]
async fn test_telemetry_ingest_and_status() {
    let app = create_router(test_state(Arc::new(FakeTracker::default())));

    let (status, body) = call(&app, "GET", "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Offline");

    let frame = json!({"vibration": 63.5, "temperature": 85.0, "aero_load": 1502.0, "timestamp": 1700000000});
    let (status, body) = call(&app, "POST", "/api/v1/telemetry", Some(frame)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (_, latest) = call(&app, "GET", "/api/v1/telemetry/latest", None).await;
    assert_eq!(latest["vibration"], 63.5);

    let (_, report) = call(&app, "GET", "/api/v1/status", None).await;
    assert_eq!(report["fleet_health"], "CRITICAL FAILURE IMMINENT");

    let (_, dashboard) = call(&app, "GET", "/api/v1/dashboard", None).await;
    assert_eq!(dashboard["health"]["status"], "CRITICAL");

    let bad = json!({"vibration": -1.0, "temperature": 85.0, "aero_load": 1500.0});
    let (status, body) = call(&app, "POST", "/api/v1/telemetry", Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn test_ticket_lifecycle() {
    let tracker = Arc::new(FakeTracker::default());
    tracker.set_labels("KAN-1", &["power-unit-vibrations"]);
    let app = create_router(test_state(tracker.clone()));

    let creds = json!({"username": "engineer", "token": "token"});
    let (status, _) = call(&app, "POST", "/api/v1/credentials", Some(creds)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "POST", "/api/v1/tickets/KAN-1/created", None).await;
    assert_eq!(body["engaged"], true);

    let failure = json!({"max_vibration": "80.00 Hz", "temperature": 86.0, "anomaly_score": 0.8});
    let (status, spec) = call(&app, "POST", "/api/v1/tickets/KAN-1/failure", Some(failure.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(spec["material_thickness_mm"], 8.0);
    assert_eq!(spec["estimated_weight_g"], 480.0);

    let (status, _) = call(&app, "POST", "/api/v1/tickets/KAN-1/failure", Some(failure)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, summary) = call(&app, "GET", "/api/v1/tickets/KAN-1", None).await;
    assert_eq!(summary["telemetry_snapshot"], "80.00 Hz");

    tracker.set_status("KAN-1", "Done");
    let (_, outcome) = call(&app, "POST", "/api/v1/tickets/KAN-1/resolved", None).await;
    assert_eq!(outcome["outcome"], "learned");

    let (_, dashboard) = call(&app, "GET", "/api/v1/dashboard", None).await;
    assert_eq!(dashboard["ai"]["knowledge_size"], 1);

    let (status, _) = call(&app, "POST", "/api/v1/tickets/KAN-1/runs", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_payloads_are_422() {
    let app = create_router(test_state(Arc::new(FakeTracker::default())));

    let failure = json!({"max_vibration": 80.0, "temperature": 86.0, "anomaly_score": 2.0});
    let (status, _) = call(&app, "POST", "/api/v1/tickets/KAN-1/failure", Some(failure)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let creds = json!({"username": "", "token": "token"});
    let (status, _) = call(&app, "POST", "/api/v1/credentials", Some(creds)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, auth) = call(&app, "GET", "/api/v1/credentials/status", None).await;
    assert_eq!(auth["is_connected"], false);
}

#[tokio::test]
async fn test_monitor_start_and_stop() {
    let app = create_router(test_state(Arc::new(FakeTracker::default())));

    let (status, body) = call(&app, "POST", "/api/v1/monitor/KAN-1/start", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "monitoring");

    let (status, _) = call(&app, "POST", "/api/v1/monitor/KAN-2/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, "POST", "/api/v1/monitor/stop", None).await;
    assert_eq!(body["status"], "stopping");
    assert_eq!(body["ticket"], "KAN-1");

    let (_, body) = call(&app, "POST", "/api/v1/monitor/stop", None).await;
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn test_safety_switches_disable_auto_fix() {
    let tracker = Arc::new(FakeTracker::default());
    tracker.set_labels("KAN-7", &["power-unit-vibrations"]);
    let app = create_router(test_state(tracker));

    let (_, body) = call(&app, "GET", "/api/v1/safety", None).await;
    assert_eq!(body, json!({"auto_fix": true, "learning": true, "language_model": true}));

    let (status, body) = call(&app, "POST", "/api/v1/safety", Some(json!({"auto_fix": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"auto_fix": false, "learning": true, "language_model": true}));

    let creds = json!({"username": "engineer", "token": "token"});
    call(&app, "POST", "/api/v1/credentials", Some(creds)).await;
    call(&app, "POST", "/api/v1/tickets/KAN-7/created", None).await;

    let failure = json!({"max_vibration": 55.0, "temperature": 86.0, "anomaly_score": 0.8});
    let (status, spec) = call(&app, "POST", "/api/v1/tickets/KAN-7/failure", Some(failure)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(spec["material_thickness_mm"], 6.0);

    let (_, summary) = call(&app, "GET", "/api/v1/tickets/KAN-7", None).await;
    assert_eq!(summary["deployment"], "No automated fix deployed");
}
