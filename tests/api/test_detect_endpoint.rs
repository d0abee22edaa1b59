use std::io::Cursor;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use fabstir_vision_node::api::{build_router, AppState};
use fabstir_vision_node::config::NodeConfig;
use fabstir_vision_node::storage::FileStore;
use fabstir_vision_node::vision::{DetectError, Detection, DetectionEngine};
use image::{DynamicImage, ImageFormat, RgbImage};
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

const BOUNDARY: &str = "node-test-boundary";

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

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(filename: &str, data: &[u8], threshold: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    if let Some(threshold) = threshold {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"confidence_threshold\"\r\n\r\n{}\r\n",
                BOUNDARY, threshold
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_disallowed_extension_rejected_before_inference() {
    let mut engine = MockEngine::new();
    engine.expect_detect().times(0);
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("anim.gif", &png_bytes(4, 4), None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "File type not allowed");
}

#[tokio::test]
async fn test_oversized_upload_rejected_without_storage_write() {
    let mut engine = MockEngine::new();
    engine.expect_detect().times(0);
    let (dir, state) = test_state(engine);
    let limit = state.config.limits.max_file_size;
    let app = build_router(state);

    // One byte over the limit
    let body = multipart_body("big.png", &vec![0u8; limit + 1], None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = response_json(response).await;
    assert_eq!(json["error"], "File size exceeds 10MB limit");

    let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
        .unwrap()
        .collect();
    assert!(uploads.is_empty(), "oversized upload must not be persisted");
}

#[tokio::test]
async fn test_missing_image_field_rejected() {
    let mut engine = MockEngine::new();
    engine.expect_detect().times(0);
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"confidence_threshold\"\r\n\r\n0.5\r\n--{}--\r\n",
            BOUNDARY, BOUNDARY
        )
        .as_bytes(),
    );
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"], "No image uploaded");
}

#[tokio::test]
async fn test_invalid_threshold_rejected() {
    let mut engine = MockEngine::new();
    engine.expect_detect().times(0);
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("scene.png", &png_bytes(4, 4), Some("not-a-float"));
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_successful_detection_response_shape() {
    let mut engine = MockEngine::new();
    engine.expect_detect().returning(|_, _| {
        Ok(vec![Detection::from_box(
            [10.0, 10.0, 50.0, 40.0],
            0.92,
            "person",
            64,
            48,
        )])
    });
    let (dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("scene.png", &png_bytes(64, 48), None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;

    assert_eq!(json["status"], "ok");
    assert_eq!(json["detections"].as_array().unwrap().len(), 1);
    assert_eq!(json["detections"][0]["label"], "person");
    assert_eq!(json["statistics"]["total_objects"], 1);
    assert_eq!(json["statistics"]["class_distribution"]["person"], 1);
    assert_eq!(json["image_metadata"]["size"], serde_json::json!([64, 48]));
    assert_eq!(json["file_info"]["original_name"], "scene.png");
    assert!(json["processing_time"].as_f64().unwrap() >= 0.0);

    // The annotated result must exist where file_info points
    assert!(dir.path().join("results/detected_scene.png").exists());
    assert!(dir.path().join("uploads/scene.png").exists());
}

#[tokio::test]
async fn test_threshold_forwarded_to_engine() {
    let mut engine = MockEngine::new();
    engine
        .expect_detect()
        .withf(|_, threshold| (*threshold - 0.25).abs() < 1e-6)
        .returning(|_, _| Ok(vec![]));
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("scene.png", &png_bytes(8, 8), Some("0.25"));
    let response = app.oneshot(detect_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_engine_failure_degrades_to_empty_result() {
    let mut engine = MockEngine::new();
    engine
        .expect_detect()
        .returning(|_, _| Err(DetectError::Inference("session exploded".to_string())));
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("scene.png", &png_bytes(16, 16), None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    // Pipeline failures degrade, they never surface as 5xx
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["detections"].as_array().unwrap().len(), 0);
    assert_eq!(
        json["statistics"].as_object().unwrap().len(),
        1,
        "degraded statistics must collapse to total_objects only"
    );
    // Metadata is extracted independently of the pipeline failure
    assert_eq!(json["image_metadata"]["size"], serde_json::json!([16, 16]));
}

#[tokio::test]
async fn test_undecodable_image_degrades_without_inference() {
    let mut engine = MockEngine::new();
    engine.expect_detect().times(0);
    let (_dir, state) = test_state(engine);
    let app = build_router(state);

    let body = multipart_body("broken.png", b"not really a png", None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["detections"].as_array().unwrap().len(), 0);
    assert!(json["image_metadata"].as_object().unwrap().is_empty());
}
