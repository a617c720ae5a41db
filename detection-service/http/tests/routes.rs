use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use detection_application::{
    ApplicationError, AudioDetectionResponse, DetectDeepfakeRequest, DetectDeepfakeUseCase,
    ModelStatus, VideoDetectionResponse,
};
use detection_domain::{Modality, Verdict};
use detection_http_server::{create_app_routes, AppState};

const BOUNDARY: &str = "deepfake-test-boundary";

/// Answers from the upload's first byte: 0 decodes badly, 1 crashes, anything
/// else succeeds. Audio is always reported unavailable.
#[derive(Default)]
struct StubUseCase {
    seen: Mutex<Vec<(usize, Option<String>)>>,
}

#[async_trait]
impl DetectDeepfakeUseCase for StubUseCase {
    async fn detect_video(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<VideoDetectionResponse, ApplicationError> {
        self.seen
            .lock()
            .expect("lock")
            .push((request.payload.len(), request.file_name.clone()));
        match request.payload.first() {
            Some(0) => Err(ApplicationError::Decode("no frames could be extracted".into())),
            Some(1) => Err(ApplicationError::Unexpected("session crashed".into())),
            _ => Ok(VideoDetectionResponse {
                deepfake_probability: 0.25,
            }),
        }
    }

    async fn detect_audio(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<AudioDetectionResponse, ApplicationError> {
        if request.payload.first() == Some(&7) {
            return Ok(AudioDetectionResponse {
                result: Verdict::Fake,
                probability: 0.7,
            });
        }
        Err(ApplicationError::ModelUnavailable {
            modality: Modality::Audio,
            reason: "audio_model.onnx missing".into(),
        })
    }

    fn model_status(&self) -> ModelStatus {
        ModelStatus {
            video_model_loaded: true,
            audio_model_loaded: false,
        }
    }
}

fn app(usecase: Arc<StubUseCase>, limit: usize) -> Router {
    create_app_routes(AppState::new(usecase), limit)
}

fn multipart_request(uri: &str, field: &str, file_name: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn video_upload_returns_probability() {
    let usecase = Arc::new(StubUseCase::default());
    let (status, body) = send(
        app(usecase.clone(), 1024),
        multipart_request("/detect-deepfake", "file", "clip.mp4", &[9, 9, 9]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deepfake_probability"], 0.25);
    assert_eq!(
        usecase.seen.lock().expect("lock").as_slice(),
        &[(3, Some("clip.mp4".to_string()))]
    );
}

#[tokio::test]
async fn audio_upload_returns_label_and_probability() {
    let (status, body) = send(
        app(Arc::new(StubUseCase::default()), 1024),
        multipart_request("/detect-deepfake-audio", "file", "voice.wav", &[7]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Fake");
    assert!((body["probability"].as_f64().expect("number") - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn outcome_kinds_map_to_status_codes() {
    let usecase = Arc::new(StubUseCase::default());

    let (status, body) = send(
        app(usecase.clone(), 1024),
        multipart_request("/detect-deepfake-audio", "file", "voice.wav", &[1]),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "model_unavailable");

    let (status, body) = send(
        app(usecase.clone(), 1024),
        multipart_request("/detect-deepfake", "file", "clip.mp4", &[0]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "decode_error");

    let (status, body) = send(
        app(usecase, 1024),
        multipart_request("/detect-deepfake", "file", "clip.mp4", &[1]),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "unexpected_failure");
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("session crashed"));
}

#[tokio::test]
async fn missing_file_field_is_rejected_before_detection() {
    let usecase = Arc::new(StubUseCase::default());
    let (status, body) = send(
        app(usecase.clone(), 1024),
        multipart_request("/detect-deepfake", "attachment", "clip.mp4", &[9]),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(usecase.seen.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let usecase = Arc::new(StubUseCase::default());
    let (status, _) = send(
        app(usecase.clone(), 64),
        multipart_request("/detect-deepfake", "file", "clip.mp4", &[9; 512]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(usecase.seen.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn health_reports_model_availability() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(app(Arc::new(StubUseCase::default()), 1024), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["video_model_loaded"], true);
    assert_eq!(body["audio_model_loaded"], false);
}
