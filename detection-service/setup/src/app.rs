use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;
use detection_application::{
    DetectDeepfakeUseCase, DetectDeepfakeUseCaseImpl, DetectionSettings, ModelArtifacts,
    ModelRegistry,
};
use detection_configuration::{AppConfig, DecisionPolicyConfig, FrameChannelOrder, MfccSettings};
use detection_domain::{
    AudioDecisionPolicy, AudioFeatureExtractorPort, AudioScorer, ChannelOrder,
    ClassifierLoaderPort, FrameSampler, FrameSize, VideoDecoderPort, VideoScorer,
};
use detection_http_server::{create_app_routes, serve, AppState};
use detection_infra_audio::MfccFeatureExtractor;
#[cfg(feature = "ffmpeg-runtime")]
use detection_infra_ffmpeg::{FfmpegAudioExtractor, FfmpegVideoDecoder};
#[cfg(feature = "onnx-runtime")]
use detection_infra_onnx::{OnnxClassifierLoader, OnnxLoaderConfig};
use media_features::MfccConfig;

#[cfg(not(feature = "ffmpeg-runtime"))]
use crate::fallback::UnavailableVideoDecoder;
#[cfg(not(feature = "onnx-runtime"))]
use crate::fallback::UnavailableClassifierLoader;

pub async fn build_and_run(config: AppConfig) -> Result<(), Error> {
    let app = Application::new(config).await?;
    app.run().await
}

pub struct Application {
    pub config: AppConfig,
    pub usecase: Arc<dyn DetectDeepfakeUseCase>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self, Error> {
        #[cfg(feature = "onnx-runtime")]
        tracing::info!("onnx runtime feature enabled");
        #[cfg(not(feature = "onnx-runtime"))]
        tracing::warn!("service compiled without `onnx-runtime`; both models will be unavailable");
        #[cfg(feature = "ffmpeg-runtime")]
        tracing::info!("ffmpeg runtime feature enabled");
        #[cfg(not(feature = "ffmpeg-runtime"))]
        tracing::warn!(
            "service compiled without `ffmpeg-runtime`; video uploads cannot be decoded and audio is WAV only"
        );

        tracing::info!(
            video_model = %config.service.video.model_path,
            audio_model = %config.service.audio.model_path,
            frame_count = config.service.video.frame_count,
            "initializing deepfake detection application"
        );

        let loader = classifier_loader(&config);
        let registry = Arc::new(ModelRegistry::load(loader.as_ref(), &model_artifacts(&config)));
        let status = registry.status();
        tracing::info!(
            video_model_loaded = status.video_model_loaded,
            audio_model_loaded = status.audio_model_loaded,
            "model registry ready"
        );

        let settings = detection_settings(&config)?;
        let features = MfccFeatureExtractor::new(mfcc_config(&config.service.mfcc))
            .map_err(|err| anyhow::anyhow!("invalid mfcc settings: {err}"))?;
        let usecase: Arc<dyn DetectDeepfakeUseCase> = Arc::new(DetectDeepfakeUseCaseImpl::new(
            registry,
            video_decoder()?,
            audio_extractor(features)?,
            settings,
        ));

        Ok(Self { config, usecase })
    }

    pub async fn run(self) -> Result<(), Error> {
        let server = &self.config.server;
        tracing::info!(
            host = %server.host,
            port = server.port,
            max_upload_bytes = server.max_upload_bytes,
            "starting deepfake detection http server"
        );

        let router = create_app_routes(AppState::new(self.usecase), server.max_upload_bytes);
        serve(router, &server.host, server.port)
            .await
            .map_err(|err| anyhow::anyhow!("server startup failed: {err}"))
    }
}

/// Maps configuration onto domain settings, rejecting sizes that would leave
/// the video pipeline with nothing to sample or score.
pub fn detection_settings(config: &AppConfig) -> Result<DetectionSettings, Error> {
    let video = &config.service.video;
    let audio = &config.service.audio;

    if video.frame_count == 0 {
        anyhow::bail!("service.video.frame_count must be at least 1");
    }
    if video.max_batch_size == 0 {
        anyhow::bail!("service.video.max_batch_size must be at least 1");
    }
    if video.frame_width == 0 || video.frame_height == 0 {
        anyhow::bail!(
            "service.video frame size must be non-zero, got {}x{}",
            video.frame_width,
            video.frame_height
        );
    }

    let channel_order = match video.channel_order {
        FrameChannelOrder::Bgr => ChannelOrder::Bgr,
        FrameChannelOrder::Rgb => ChannelOrder::Rgb,
    };
    let policy = match audio.decision_policy {
        DecisionPolicyConfig::WinningClass => AudioDecisionPolicy::WinningClass {
            fake_class_index: audio.fake_class_index,
        },
        DecisionPolicyConfig::MaxClass => AudioDecisionPolicy::MaxClassProbability,
        DecisionPolicyConfig::FakeClass => AudioDecisionPolicy::FakeClassProbability {
            fake_class_index: audio.fake_class_index,
        },
    };

    Ok(DetectionSettings {
        sampler: FrameSampler::new(
            video.frame_count,
            FrameSize::new(video.frame_width, video.frame_height),
            channel_order,
        ),
        video_scorer: VideoScorer::new(video.max_batch_size),
        audio_scorer: AudioScorer::new(policy),
    })
}

fn model_artifacts(config: &AppConfig) -> ModelArtifacts {
    ModelArtifacts {
        video_model_path: PathBuf::from(&config.service.video.model_path),
        audio_model_path: PathBuf::from(&config.service.audio.model_path),
    }
}

fn mfcc_config(settings: &MfccSettings) -> MfccConfig {
    MfccConfig {
        n_mfcc: settings.n_mfcc,
        n_fft: settings.n_fft,
        hop_length: settings.hop_length,
        n_mels: settings.n_mels,
        top_db: settings.top_db,
    }
}

#[cfg(feature = "onnx-runtime")]
fn classifier_loader(config: &AppConfig) -> Box<dyn ClassifierLoaderPort> {
    Box::new(OnnxClassifierLoader::new(OnnxLoaderConfig {
        audio_probability_output: config.service.audio.probability_output,
        ..OnnxLoaderConfig::default()
    }))
}

#[cfg(not(feature = "onnx-runtime"))]
fn classifier_loader(_config: &AppConfig) -> Box<dyn ClassifierLoaderPort> {
    Box::new(UnavailableClassifierLoader)
}

#[cfg(feature = "ffmpeg-runtime")]
fn video_decoder() -> Result<Arc<dyn VideoDecoderPort>, Error> {
    let decoder =
        FfmpegVideoDecoder::new().map_err(|err| anyhow::anyhow!("ffmpeg unavailable: {err}"))?;
    Ok(Arc::new(decoder))
}

#[cfg(not(feature = "ffmpeg-runtime"))]
fn video_decoder() -> Result<Arc<dyn VideoDecoderPort>, Error> {
    Ok(Arc::new(UnavailableVideoDecoder))
}

#[cfg(feature = "ffmpeg-runtime")]
fn audio_extractor(
    features: MfccFeatureExtractor,
) -> Result<Arc<dyn AudioFeatureExtractorPort>, Error> {
    let extractor = FfmpegAudioExtractor::new(features)
        .map_err(|err| anyhow::anyhow!("ffmpeg unavailable: {err}"))?;
    Ok(Arc::new(extractor))
}

#[cfg(not(feature = "ffmpeg-runtime"))]
fn audio_extractor(
    features: MfccFeatureExtractor,
) -> Result<Arc<dyn AudioFeatureExtractorPort>, Error> {
    Ok(Arc::new(features))
}

#[cfg(test)]
mod tests {
    use detection_configuration::DetectionConfig;

    use super::*;

    #[test]
    fn settings_follow_configuration() {
        let mut config = DetectionConfig::default();
        config.service.video.frame_count = 12;
        config.service.video.channel_order = FrameChannelOrder::Rgb;
        config.service.audio.decision_policy = DecisionPolicyConfig::FakeClass;
        config.service.audio.fake_class_index = 0;

        let settings = detection_settings(&config).expect("valid settings");
        assert_eq!(settings.sampler.frame_count(), 12);
        assert_eq!(
            settings.audio_scorer.policy(),
            AudioDecisionPolicy::FakeClassProbability {
                fake_class_index: 0
            }
        );
    }

    #[test]
    fn default_settings_use_winning_class_policy() {
        let settings = detection_settings(&DetectionConfig::default()).expect("valid settings");
        assert_eq!(settings.sampler.frame_count(), 50);
        assert_eq!(
            settings.audio_scorer.policy(),
            AudioDecisionPolicy::WinningClass {
                fake_class_index: 1
            }
        );
    }

    #[test]
    fn zero_sized_video_settings_are_rejected() {
        let mut config = DetectionConfig::default();
        config.service.video.frame_count = 0;
        let err = detection_settings(&config).err().expect("zero frame count");
        assert!(err.to_string().contains("frame_count"));

        let mut config = DetectionConfig::default();
        config.service.video.max_batch_size = 0;
        let err = detection_settings(&config).err().expect("zero batch size");
        assert!(err.to_string().contains("max_batch_size"));

        let mut config = DetectionConfig::default();
        config.service.video.frame_width = 0;
        assert!(detection_settings(&config).is_err());
    }

    #[tokio::test]
    async fn application_refuses_zero_frame_count() {
        let mut config = DetectionConfig::default();
        config.service.video.frame_count = 0;
        assert!(Application::new(config).await.is_err());
    }

    #[cfg(not(feature = "onnx-runtime"))]
    #[tokio::test]
    async fn application_starts_with_models_unavailable_without_runtime() {
        let app = Application::new(DetectionConfig::default())
            .await
            .expect("application builds");
        let status = app.usecase.model_status();
        assert!(!status.video_model_loaded);
        assert!(!status.audio_model_loaded);
    }
}
