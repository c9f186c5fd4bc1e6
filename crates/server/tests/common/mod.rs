//! Common test utilities for driving the router in-process.
//!
//! The fixture wires a real `DirectoryTransport` rooted in a temp dir to a
//! supervisor whose converter is a `MockConverter`, so whole runs complete
//! without ffmpeg or a renderer installed.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use packforge_core::{
    testing::MockConverter, CacheConfig, Config, ContentCache, DirectoryTransport,
    DirectoryTransportConfig, NoopContentCache, NoopMetrics, RunConfig, RunSupervisor,
    ServerConfig, SqliteContentCache, StatusBoard,
};
use packforge_server::state::AppState;

/// Test fixture with an in-process router.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - control conversion outcomes and timing
    pub converter: MockConverter,
    /// Holds sources, outbox, cache and run folders
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_concurrent_runs: usize,
    pub queue_when_busy: bool,
    pub retained_runs: usize,
    pub cache_enabled: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 2,
            queue_when_busy: false,
            retained_runs: 100,
            cache_enabled: true,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                max_concurrent_runs: test_config.max_concurrent_runs,
                queue_when_busy: test_config.queue_when_busy,
                retained_runs: test_config.retained_runs,
            },
            run: RunConfig::default()
                .with_temp_dir(root.join("runs"))
                .with_tick_interval_ms(20)
                .with_deadline_secs(10),
            cache: CacheConfig {
                enabled: test_config.cache_enabled,
                dir: root.join("cache"),
                database_path: None,
            },
            transport: DirectoryTransportConfig::default()
                .with_source_root(root.join("sources"))
                .with_outbox_dir(root.join("outbox"))
                .with_download_dir(root.join("downloads")),
            ..Default::default()
        };

        let (cache, sqlite_cache): (Arc<dyn ContentCache>, Option<Arc<SqliteContentCache>>) =
            if config.cache.enabled {
                let sqlite = Arc::new(
                    SqliteContentCache::new(&config.cache.resolved_database_path(), &config.cache.dir)
                        .expect("Failed to create cache"),
                );
                (sqlite.clone() as Arc<dyn ContentCache>, Some(sqlite))
            } else {
                (Arc::new(NoopContentCache), None)
            };

        let converter = MockConverter::new();
        let supervisor = Arc::new(RunSupervisor::new(
            config.run.clone().with_cache_writes(config.cache.enabled),
            Arc::new(converter.clone()),
            cache,
            Arc::new(NoopMetrics),
        ));
        let transport = DirectoryTransport::new(config.transport.clone(), StatusBoard::new());

        let state = Arc::new(AppState::new(config, supervisor, transport, sqlite_cache));
        let router = packforge_server::api::create_router(state);

        Self {
            router,
            converter,
            temp_dir,
        }
    }

    /// Create a collection folder holding the given files.
    pub fn add_source(&self, name: &str, files: &[&str]) {
        let dir = self.temp_dir.path().join("sources").join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create source dir");
        for file in files {
            std::fs::write(dir.join(file), format!("payload of {}", file))
                .expect("Failed to write source file");
        }
    }

    /// Archives delivered for a collection, sorted by name.
    pub fn delivered(&self, source: &str) -> Vec<PathBuf> {
        let dir = self.temp_dir.path().join("outbox").join(source);
        let mut archives: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default();
        archives.sort();
        archives
    }

    /// Poll a run until it reaches the `done` state.
    pub async fn wait_for_run(&self, id: &str) -> Value {
        for _ in 0..400 {
            let response = self.get(&format!("/api/v1/runs/{}", id)).await;
            let finished = !response.body["summary"].is_null() || !response.body["error"].is_null();
            if response.body["state"] == "done" && finished {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("Run {} did not finish in time", id);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Fetch a plain-text endpoint.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
