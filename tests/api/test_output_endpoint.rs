use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
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

fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = NodeConfig::default();
    config.storage.upload_dir = dir.path().join("uploads");
    config.storage.results_dir = dir.path().join("results");
    let store = Arc::new(FileStore::new(&config.storage).unwrap());
    let state = AppState {
        engine: Arc::new(MockEngine::new()),
        store,
        config: Arc::new(config),
    };
    (dir, state)
}

#[tokio::test]
async fn test_output_serves_existing_result_as_jpeg() {
    let (dir, state) = test_state();
    let payload = b"jpeg-ish bytes";
    std::fs::write(dir.path().join("results/detected_cat.jpg"), payload).unwrap();
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/output/detected_cat.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], payload);
}

#[tokio::test]
async fn test_output_missing_file_is_404() {
    let (_dir, state) = test_state();
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/output/detected_nothing.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn test_output_sanitizes_traversal_attempts() {
    let (dir, state) = test_state();
    // A file that a traversal would reach if sanitization were missing
    std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/output/..%2Fsecret.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
