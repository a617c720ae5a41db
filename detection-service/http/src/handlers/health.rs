use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub video_model_loaded: bool,
    pub audio_model_loaded: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let models = state.usecase.model_status();
    Json(HealthResponse {
        status: "ok",
        video_model_loaded: models.video_model_loaded,
        audio_model_loaded: models.audio_model_loaded,
    })
}
