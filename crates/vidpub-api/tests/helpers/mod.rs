//! Test helpers: build the router around in-memory collaborators.
//!
//! Metadata lives in `InMemoryVideoRepository`, objects in [`storage::MemoryStorage`],
//! and ffprobe/ffmpeg are scripted with `FakeMediaTools`, so no external service or
//! media tool is needed.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;
pub mod storage;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;
use uuid::Uuid;
use vidpub_api::setup::{routes, services};
use vidpub_core::{Config, VideoResponse};
use vidpub_db::InMemoryVideoRepository;
use vidpub_processing::testing::{FakeMediaTools, ProbeBehavior, RemuxBehavior};
use vidpub_storage::create_thumbnail_sink;

use auth::{TestUser, TEST_JWT_SECRET};
use storage::MemoryStorage;

pub const PUBLIC_BASE_URL: &str = "http://vidpub.test";

/// Test application and the collaborators behind it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryStorage>,
    pub tools: Arc<FakeMediaTools>,
    pub staging_dir: TempDir,
    pub assets_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Files left in the staging directory
    pub fn staged_files(&self) -> Vec<String> {
        list_files(self.staging_dir.path())
    }

    /// Create a draft video owned by `user`.
    pub async fn create_video(&self, user: &TestUser) -> Uuid {
        let response = self
            .server
            .post("/api/videos")
            .add_header("Authorization", user.bearer())
            .json(&serde_json::json!({ "title": "Boots and cats" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<VideoResponse>().id
    }

    pub async fn get_video(&self, user: &TestUser, video_id: Uuid) -> VideoResponse {
        let response = self
            .server
            .get(&format!("/api/videos/{}", video_id))
            .add_header("Authorization", user.bearer())
            .await;
        response.assert_status_ok();
        response.json::<VideoResponse>()
    }
}

fn list_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Default app: 16:9 probe, successful remux, signed URLs with a 60 second TTL,
/// thumbnails in memory. Pass `THUMBNAIL_BACKEND=filesystem` to write them under `assets_dir`.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(ProbeBehavior::default(), RemuxBehavior::default(), &[])
}

pub fn setup_test_app_with(
    probe: ProbeBehavior,
    remux: RemuxBehavior,
    extra_env: &[(&str, &str)],
) -> TestApp {
    let staging_dir = tempfile::tempdir().expect("Failed to create staging dir");
    let assets_dir = tempfile::tempdir().expect("Failed to create assets dir");

    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        ("PUBLIC_BASE_URL".to_string(), PUBLIC_BASE_URL.to_string()),
        ("STORAGE_BACKEND".to_string(), "local".to_string()),
        ("URL_STRATEGY".to_string(), "signed".to_string()),
        ("SIGNED_URL_TTL_SECS".to_string(), "60".to_string()),
        ("THUMBNAIL_BACKEND".to_string(), "memory".to_string()),
        (
            "STAGING_DIR".to_string(),
            staging_dir.path().to_string_lossy().to_string(),
        ),
        (
            "ASSETS_ROOT".to_string(),
            assets_dir.path().to_string_lossy().to_string(),
        ),
    ]);
    for (key, value) in extra_env {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");
    config.validate().expect("Invalid test config");

    let storage = Arc::new(MemoryStorage::new());
    let tools = Arc::new(FakeMediaTools::new(probe, remux));
    let thumbnails = create_thumbnail_sink(&config);

    let state = services::initialize_services(
        config,
        Arc::new(InMemoryVideoRepository::new()),
        storage.clone(),
        tools.clone(),
        thumbnails,
    )
    .expect("Failed to build app state");

    let server = TestServer::new(routes::setup_routes(state)).expect("Failed to start test server");

    TestApp {
        server,
        storage,
        tools,
        staging_dir,
        assets_dir,
    }
}
