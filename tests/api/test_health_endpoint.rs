use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use fabstir_vision_node::api::{build_router, AppState};
use fabstir_vision_node::config::NodeConfig;
use fabstir_vision_node::storage::FileStore;
use fabstir_vision_node::vision::{DetectError, Detection, DetectionEngine};
use image::DynamicImage;
use tower::ServiceExt;

mockall::mock! {
    pub Engine {}

    impl DetectionEngine for Engine {
        fn detect(
            &self,
            image: &DynamicImage,
            confidence_threshold: f32,
        ) -> Result<Vec<Detection>, DetectError>;

        fn model_name(&self) -> String;
    }
}

fn test_state(engine: MockEngine) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = NodeConfig::default();
    config.storage.upload_dir = dir.path().join("uploads");
    config.storage.results_dir = dir.path().join("results");
    let store = Arc::new(FileStore::new(&config.storage).unwrap());
    let state = AppState {
        engine: Arc::new(engine),
        store,
        config: Arc::new(config),
    };
    (dir, state)
}

#[tokio::test]
async fn test_health_reports_status_and_config() {
    let mut engine = MockEngine::new();
    engine
        .expect_model_name()
        .returning(|| "fasterrcnn_resnet50_fpn".to_string());
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].as_f64().unwrap() > 0.0);
    assert_eq!(json["model"], "fasterrcnn_resnet50_fpn");
    assert_eq!(json["config"]["max_file_size"], 10 * 1024 * 1024);
    assert_eq!(
        json["config"]["allowed_extensions"],
        serde_json::json!(["png", "jpg", "jpeg", "webp"])
    );
}
