//! HTTP API tests against the router with a fake score model

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crop_diagnosis::inference::ImageTensor;
use crop_diagnosis::{DiagnosisService, ScoreModel};
use crop_diagnosis_server::{create_router, AppState, ServerConfig};

const BOUNDARY: &str = "XLEAFBOUNDARY";

struct CountingModel {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl CountingModel {
    fn peaked_at(index: usize) -> Arc<Self> {
        let mut scores = vec![0.0f32; 15];
        scores[index] = 5.0;
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoreModel for CountingModel {
    fn forward_scores(&self, _input: &ImageTensor) -> crop_diagnosis::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

fn app(model: Arc<CountingModel>, report_dir: &TempDir) -> Router {
    let config = ServerConfig {
        report_dir: report_dir.path().to_path_buf(),
        ..ServerConfig::default()
    };
    create_router(Arc::new(AppState::new(DiagnosisService::new(model), config)))
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([40, 150, 30])))
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn multipart_request(field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"leaf.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/crop-diagnosis")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn report_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate-report")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_liveness_payload() {
    let tmp = TempDir::new().unwrap();
    let response = app(CountingModel::peaked_at(0), &tmp)
        .oneshot(Request::get("/api/test").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "Backend working!"}));
}

#[tokio::test]
async fn test_missing_image_field_never_calls_model() {
    let tmp = TempDir::new().unwrap();
    let model = CountingModel::peaked_at(0);

    let response = app(model.clone(), &tmp)
        .oneshot(multipart_request("photo", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "No image uploaded"}));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_missing_image() {
    let tmp = TempDir::new().unwrap();
    let model = CountingModel::peaked_at(0);

    let request = Request::builder()
        .method("POST")
        .uri("/api/crop-diagnosis")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app(model.clone(), &tmp).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "No image uploaded"}));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_diagnosis_of_uploaded_image() {
    let tmp = TempDir::new().unwrap();
    // Potato___Late_blight
    let model = CountingModel::peaked_at(4);

    let response = app(model.clone(), &tmp)
        .oneshot(multipart_request("image", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(model.calls(), 1);

    let body = json_body(response).await;
    assert_eq!(body["crop"], "Potato");
    assert_eq!(body["status"], "Diseased");
    assert_eq!(body["disease"], "Late blight");
    assert_eq!(body["severity"], "Severe");
    assert_eq!(
        body["advice"],
        "Destroy infected plants and avoid wet conditions."
    );

    let confidence = body["confidence"].as_f64().unwrap();
    let expected = 5f64.exp() / (5f64.exp() + 14.0);
    assert!((confidence - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_healthy_upload() {
    let tmp = TempDir::new().unwrap();
    // Tomato___healthy
    let response = app(CountingModel::peaked_at(7), &tmp)
        .oneshot(multipart_request("image", &png_bytes()))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["crop"], "Tomato");
    assert_eq!(body["status"], "Healthy");
    assert_eq!(body["disease"], "None");
    assert_eq!(body["severity"], "None");
}

#[tokio::test]
async fn test_undecodable_image_is_server_error() {
    let tmp = TempDir::new().unwrap();
    let model = CountingModel::peaked_at(0);

    let response = app(model.clone(), &tmp)
        .oneshot(multipart_request("image", b"definitely not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_report_is_pdf_attachment() {
    let tmp = TempDir::new().unwrap();
    let request = report_request(json!({
        "crop": "Tomato",
        "status": "Diseased",
        "disease": "Early blight",
        "severity": "Moderate",
        "confidence": 0.55,
        "advice": "Remove infected leaves and use fungicide."
    }));

    let response = app(CountingModel::peaked_at(0), &tmp)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"crop_report.pdf\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(tmp.path().join("crop_report.pdf").exists());
}

#[tokio::test]
async fn test_report_missing_field_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let request = report_request(json!({
        "status": "Diseased",
        "disease": "Early blight",
        "severity": "Moderate",
        "confidence": 0.55,
        "advice": "Remove infected leaves and use fungicide."
    }));

    let response = app(CountingModel::peaked_at(0), &tmp)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("missing field `crop`"));
    assert!(!tmp.path().join("crop_report.pdf").exists());
}
