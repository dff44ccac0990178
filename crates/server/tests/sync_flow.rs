//! End-to-end: attach over HTTP, append to the log, poll, observe
//! completions in the checklist and in the progress file, then stop.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use leveling_sync_core::{Checklist, JsonProgressStore, SyncConfig};
use leveling_sync_server::{create_app, AppState};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

const GUIDE: &str = r#"{
    "general": { "steps": ["Set loot filter"] },
    "acts": [
        { "id": 1, "steps": [
            { "text": "Run through The Coast", "zones": ["The Coast"] },
            { "text": "Kill Hillock", "zones": ["The Twilight Strand"] },
            "Take the quicksilver flask"
        ]},
        { "id": 2, "steps": [
            { "text": "Find the Crossroads", "zones": ["The Crossroads"] },
            { "text": "Enter the Chamber of Sins", "zones": ["The Chamber of Sins"] }
        ]}
    ]
}"#;

async fn call(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header("content-type", "application/json");
    }
    let response = app
        .clone()
        .oneshot(req.body(Body::from(body.unwrap_or_default())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn append(path: &Path, text: &str) {
    let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
}

fn app(dir: &Path) -> Router {
    let checklist = Checklist::from_json_str(GUIDE).unwrap();
    let progress = JsonProgressStore::load(dir.join("progress.json")).unwrap();
    let config = SyncConfig {
        // Long enough that only explicit polls run during the test.
        poll_interval: std::time::Duration::from_secs(3600),
        ..SyncConfig::default()
    };
    create_app(AppState::new(config, Arc::new(checklist), progress))
}

#[tokio::test]
async fn attach_poll_complete_stop() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("Client.txt");
    std::fs::write(
        &log,
        "2024/01/01 10:00:00 1 [INFO Client 1] Generating level 1 area \"1_1_1\" with seed 7\n",
    )
    .unwrap();
    let app = app(dir.path());

    let body = serde_json::json!({ "path": log }).to_string();
    let (status, json) = call(&app, "POST", "/api/sync/attach", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], true);
    // The stage is known from the bootstrap window, but no location yet.
    assert!(json.get("reached").is_none());

    append(
        &log,
        "2024/01/01 10:00:05 2 [DEBUG Client 1] [SCENE] Set Source [The Twilight Strand]\n",
    );
    let (status, json) = call(&app, "POST", "/api/sync/poll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "[act1] The Twilight Strand");
    assert_eq!(json["reached"], "act1-1");

    let (_, checklist) = call(&app, "GET", "/api/checklist", None).await;
    let checked: Vec<bool> = checklist[1]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["checked"].as_bool().unwrap())
        .collect();
    assert_eq!(checked, vec![true, true, false]);
    assert_eq!(checklist[0]["steps"][0]["checked"], true);
    assert_eq!(checklist[2]["progress"]["checked"], 0);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("progress.json")).unwrap()).unwrap();
    assert_eq!(saved["general-0"], true);
    assert_eq!(saved["act1-1"], true);
    assert!(saved.get("act1-2").is_none());

    let (status, _) = call(&app, "POST", "/api/sync/stop", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = call(&app, "GET", "/api/sync/status", None).await;
    assert_eq!(json, serde_json::json!({ "active": false }));
}

#[tokio::test]
async fn new_act_sweeps_previous_acts() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("Client.txt");
    std::fs::write(&log, "").unwrap();
    let app = app(dir.path());

    let body = serde_json::json!({ "path": log }).to_string();
    call(&app, "POST", "/api/sync/attach", Some(body)).await;

    append(
        &log,
        concat!(
            "Generating level 13 area \"1_2_town\" with seed 1\n",
            "[SCENE] Set Source [The Crossroads]\n",
        ),
    );
    let (status, json) = call(&app, "POST", "/api/sync/poll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reached"], "act2-0");

    let (_, checklist) = call(&app, "GET", "/api/checklist", None).await;
    assert_eq!(checklist[1]["progress"]["checked"], 3);
    assert_eq!(checklist[2]["progress"]["checked"], 1);
    assert_eq!(checklist[2]["steps"][1]["checked"], false);

    // Manual uncheck survives: sync never un-marks, but the user may.
    let (status, _) = call(
        &app,
        "POST",
        "/api/progress/act1-2",
        Some(r#"{"checked":false}"#.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, checklist) = call(&app, "GET", "/api/checklist", None).await;
    assert_eq!(checklist[1]["steps"][2]["checked"], false);

    call(&app, "POST", "/api/sync/stop", None).await;
}

#[tokio::test]
async fn location_without_known_act_resolves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("Client.txt");
    std::fs::write(&log, "").unwrap();
    let app = app(dir.path());

    let body = serde_json::json!({ "path": log }).to_string();
    call(&app, "POST", "/api/sync/attach", Some(body)).await;

    append(&log, "[SCENE] Set Source [The Coast]\n");
    let (_, json) = call(&app, "POST", "/api/sync/poll", None).await;
    assert_eq!(json["label"], "[?] The Coast");
    assert!(json.get("reached").is_none());
    assert!(!dir.path().join("progress.json").exists());

    call(&app, "POST", "/api/sync/stop", None).await;
}
