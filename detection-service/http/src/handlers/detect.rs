use axum::{
    extract::{Multipart, State},
    response::Json,
};

use detection_application::{AudioDetectionResponse, DetectDeepfakeRequest, VideoDetectionResponse};

use crate::error::{error_mapper, HttpError};
use crate::AppState;

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

pub async fn detect_deepfake(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VideoDetectionResponse>, HttpError> {
    let request = read_upload(multipart).await?;
    tracing::info!(
        payload_bytes = request.payload.len(),
        file_name = request.file_name.as_deref().unwrap_or("unnamed"),
        "received video detection request"
    );

    match state.usecase.detect_video(request).await {
        Ok(response) => {
            tracing::info!(
                deepfake_probability = response.deepfake_probability,
                "video detection request completed"
            );
            Ok(Json(response))
        }
        Err(error) => {
            tracing::error!(error = %error, kind = error.kind(), "video detection request failed");
            Err(error_mapper(error))
        }
    }
}

pub async fn detect_deepfake_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AudioDetectionResponse>, HttpError> {
    let request = read_upload(multipart).await?;
    tracing::info!(
        payload_bytes = request.payload.len(),
        file_name = request.file_name.as_deref().unwrap_or("unnamed"),
        "received audio detection request"
    );

    match state.usecase.detect_audio(request).await {
        Ok(response) => {
            tracing::info!(
                result = ?response.result,
                probability = response.probability,
                "audio detection request completed"
            );
            Ok(Json(response))
        }
        Err(error) => {
            tracing::error!(error = %error, kind = error.kind(), "audio detection request failed");
            Err(error_mapper(error))
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<DetectDeepfakeRequest, HttpError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let payload = field.bytes().await?.to_vec();
        let request = DetectDeepfakeRequest::new(payload);
        return Ok(match file_name {
            Some(name) => request.with_file_name(name),
            None => request,
        });
    }

    Err(HttpError::Validation {
        message: format!("multipart field `{UPLOAD_FIELD}` is required"),
    })
}
