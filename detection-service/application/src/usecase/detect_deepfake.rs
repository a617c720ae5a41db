use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use detection_domain::{
    AudioFeatureExtractorPort, AudioScorer, DomainError, FrameSampler, VideoDecoderPort,
    VideoScorer,
};

use crate::{
    ApplicationError, AudioDetectionResponse, DetectDeepfakeRequest, ModelRegistry, ModelStatus,
    VideoDetectionResponse,
};

#[async_trait]
pub trait DetectDeepfakeUseCase: Send + Sync {
    async fn detect_video(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<VideoDetectionResponse, ApplicationError>;

    async fn detect_audio(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<AudioDetectionResponse, ApplicationError>;

    fn model_status(&self) -> ModelStatus;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSettings {
    pub sampler: FrameSampler,
    pub video_scorer: VideoScorer,
    pub audio_scorer: AudioScorer,
}

pub struct DetectDeepfakeUseCaseImpl {
    registry: Arc<ModelRegistry>,
    video_decoder: Arc<dyn VideoDecoderPort>,
    feature_extractor: Arc<dyn AudioFeatureExtractorPort>,
    settings: DetectionSettings,
}

impl DetectDeepfakeUseCaseImpl {
    pub fn new(
        registry: Arc<ModelRegistry>,
        video_decoder: Arc<dyn VideoDecoderPort>,
        feature_extractor: Arc<dyn AudioFeatureExtractorPort>,
        settings: DetectionSettings,
    ) -> Self {
        Self {
            registry,
            video_decoder,
            feature_extractor,
            settings,
        }
    }
}

#[async_trait]
impl DetectDeepfakeUseCase for DetectDeepfakeUseCaseImpl {
    async fn detect_video(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<VideoDetectionResponse, ApplicationError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            %request_id,
            payload_bytes = request.payload.len(),
            file_name = request.file_name.as_deref().unwrap_or("unnamed"),
            "starting video detection"
        );

        let classifier = self.registry.video_classifier()?;
        let decoder = Arc::clone(&self.video_decoder);
        let sampler = self.settings.sampler;
        let scorer = self.settings.video_scorer;
        let source = request.into_source();

        let assessment = run_blocking(move || {
            let batch = sampler.sample(decoder.as_ref(), &source)?;
            scorer.score(&batch, classifier.as_ref())
        })
        .await?;

        tracing::debug!(
            %request_id,
            frames_scored = assessment.frames_scored,
            deepfake_probability = assessment.deepfake_probability,
            "video detection completed"
        );

        Ok(assessment.into())
    }

    async fn detect_audio(
        &self,
        request: DetectDeepfakeRequest,
    ) -> Result<AudioDetectionResponse, ApplicationError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            %request_id,
            payload_bytes = request.payload.len(),
            file_name = request.file_name.as_deref().unwrap_or("unnamed"),
            "starting audio detection"
        );

        let classifier = self.registry.audio_classifier()?;
        let extractor = Arc::clone(&self.feature_extractor);
        let scorer = self.settings.audio_scorer;
        let source = request.into_source();

        let assessment = run_blocking(move || {
            let features = extractor.extract(&source)?;
            scorer.score(&features, classifier.as_ref())
        })
        .await?;

        tracing::debug!(
            %request_id,
            verdict = ?assessment.verdict,
            probability = assessment.probability,
            "audio detection completed"
        );

        Ok(assessment.into())
    }

    fn model_status(&self) -> ModelStatus {
        self.registry.status()
    }
}

/// Runs decode and inference off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, ApplicationError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApplicationError::Unexpected(format!("inference task failed: {err}")))?
        .map_err(ApplicationError::from)
}
