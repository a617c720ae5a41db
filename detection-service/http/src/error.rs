use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use detection_application::ApplicationError;

#[derive(Debug)]
pub enum HttpError {
    Validation { message: String },
    PayloadTooLarge { message: String },
    ModelUnavailable { message: String },
    Decode { message: String },
    Internal { message: String },
}

impl HttpError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            HttpError::Validation { message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
            }
            HttpError::PayloadTooLarge { message } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
            }
            HttpError::ModelUnavailable { message } => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", message)
            }
            HttpError::Decode { message } => (StatusCode::BAD_REQUEST, "decode_error", message),
            HttpError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "unexpected_failure",
                message,
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();

        (
            status,
            Json(json!({
                "error": kind,
                "detail": message,
            })),
        )
            .into_response()
    }
}

pub fn error_mapper(error: ApplicationError) -> HttpError {
    let message = error.to_string();
    match error {
        ApplicationError::ModelUnavailable { .. } => HttpError::ModelUnavailable { message },
        ApplicationError::Decode(_) => HttpError::Decode { message },
        ApplicationError::Unexpected(_) => HttpError::Internal { message },
    }
}

impl From<MultipartError> for HttpError {
    fn from(error: MultipartError) -> Self {
        let message = error.body_text();
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HttpError::PayloadTooLarge { message }
        } else {
            HttpError::Validation { message }
        }
    }
}
