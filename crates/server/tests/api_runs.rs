//! Router-level tests for runs, cache stats and service endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestConfig, TestFixture};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_exposed() {
    let fixture = TestFixture::with_config(TestConfig {
        max_concurrent_runs: 3,
        ..Default::default()
    })
    .await;

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["server"]["max_concurrent_runs"], 3);
    assert_eq!(response.body["run"]["worker_count"], 4);
}

#[tokio::test]
async fn test_run_delivers_archive() {
    let fixture = TestFixture::new().await;
    fixture.add_source("cats", &["a.webp", "b.webp", "c.webm"]);

    let response = fixture
        .post("/api/v1/runs", json!({ "source": "cats" }))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["source"], "cats");
    let id = response.body["id"].as_str().unwrap().to_string();

    let run = fixture.wait_for_run(&id).await;

    assert_eq!(run["summary"]["outcome"], "completed");
    assert_eq!(run["summary"]["finished"], 3);
    assert_eq!(run["summary"]["failed"], 0);
    assert_eq!(run["summary"]["uploaded_batches"], 1);
    assert_eq!(run["status"], "Upload complete!\nSet: cats\nArchives: 1");

    let delivered = fixture.delivered("cats");
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_part-0.zip"));
}

#[tokio::test]
async fn test_invalid_source_name_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/runs", json!({ "source": "../etc" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].as_str().unwrap().contains("../etc"));
}

#[tokio::test]
async fn test_missing_source_reports_error() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/runs", json!({ "source": "nowhere" }))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    let id = response.body["id"].as_str().unwrap().to_string();

    let run = fixture.wait_for_run(&id).await;

    assert!(run["summary"].is_null());
    assert!(run["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_capacity_limit_returns_503() {
    let fixture = TestFixture::with_config(TestConfig {
        max_concurrent_runs: 1,
        ..Default::default()
    })
    .await;
    fixture.add_source("slow", &["a.webm"]);
    fixture.converter.set_conversion_duration(1_000).await;

    let first = fixture
        .post("/api/v1/runs", json!({ "source": "slow" }))
        .await;
    assert_status!(first, StatusCode::ACCEPTED);

    let second = fixture
        .post("/api/v1/runs", json!({ "source": "slow" }))
        .await;
    assert_status!(second, StatusCode::SERVICE_UNAVAILABLE);

    let id = first.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_run(&id).await;
}

#[tokio::test]
async fn test_busy_server_queues_runs_when_configured() {
    let fixture = TestFixture::with_config(TestConfig {
        max_concurrent_runs: 1,
        queue_when_busy: true,
        ..Default::default()
    })
    .await;
    fixture.add_source("slow", &["a.webm"]);
    fixture.converter.set_conversion_duration(300).await;

    let first = fixture
        .post("/api/v1/runs", json!({ "source": "slow" }))
        .await;
    let second = fixture
        .post("/api/v1/runs", json!({ "source": "slow" }))
        .await;
    assert_status!(first, StatusCode::ACCEPTED);
    assert_status!(second, StatusCode::ACCEPTED);

    for response in [first, second] {
        let id = response.body["id"].as_str().unwrap().to_string();
        let run = fixture.wait_for_run(&id).await;
        assert_eq!(run["summary"]["outcome"], "completed");
        assert_eq!(run["summary"]["finished"], 1);
    }
    assert_eq!(fixture.delivered("slow").len(), 2);
}

#[tokio::test]
async fn test_finished_runs_beyond_retention_are_forgotten() {
    let fixture = TestFixture::with_config(TestConfig {
        retained_runs: 2,
        ..Default::default()
    })
    .await;
    fixture.add_source("dogs", &["a.webp"]);

    let mut ids = Vec::new();
    for _ in 0..4 {
        let started = fixture
            .post("/api/v1/runs", json!({ "source": "dogs" }))
            .await;
        let id = started.body["id"].as_str().unwrap().to_string();
        fixture.wait_for_run(&id).await;
        ids.push(id);
    }

    let response = fixture.get("/api/v1/runs").await;
    let runs = response.body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["id"], ids[3].as_str());
    assert_eq!(runs[1]["id"], ids[2].as_str());

    let evicted = fixture.get(&format!("/api/v1/runs/{}", ids[0])).await;
    assert_status!(evicted, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_run_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/runs/does-not-exist").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_runs_includes_started_runs() {
    let fixture = TestFixture::new().await;
    fixture.add_source("dogs", &["a.webp"]);

    let started = fixture
        .post("/api/v1/runs", json!({ "source": "dogs" }))
        .await;
    let id = started.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_run(&id).await;

    let response = fixture.get("/api/v1/runs").await;

    assert_status!(response, StatusCode::OK);
    let runs = response.body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["id"], id.as_str());
    assert_eq!(runs[0]["state"], "done");
}

#[tokio::test]
async fn test_cache_stats_after_run() {
    let fixture = TestFixture::new().await;
    fixture.add_source("birds", &["a.webp", "b.webp"]);

    let started = fixture
        .post("/api/v1/runs", json!({ "source": "birds" }))
        .await;
    let id = started.body["id"].as_str().unwrap().to_string();
    fixture.wait_for_run(&id).await;

    let response = fixture.get("/api/v1/cache/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enabled"], true);
    assert_eq!(response.body["entries"], 2);
}

#[tokio::test]
async fn test_cache_stats_when_disabled() {
    let fixture = TestFixture::with_config(TestConfig {
        cache_enabled: false,
        ..Default::default()
    })
    .await;

    let response = fixture.get("/api/v1/cache/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enabled"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, text) = fixture.get_text("/api/v1/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("packforge_http_requests_total"));
    assert!(text.contains("packforge_runs_active"));
}
