use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use detection_domain::{
    ClassifierLoaderPort, DomainError, FeatureClassifier, FrameClassifier, Modality,
};

/// A classifier that either loaded at startup or did not, with the reason kept.
pub enum ModelSlot<T: ?Sized> {
    Ready(Arc<T>),
    Unavailable { reason: String },
}

impl<T: ?Sized> ModelSlot<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelSlot::Ready(_))
    }

    fn require(&self, modality: Modality) -> Result<Arc<T>, DomainError> {
        match self {
            ModelSlot::Ready(model) => Ok(Arc::clone(model)),
            ModelSlot::Unavailable { reason } => {
                Err(DomainError::model_unavailable(modality, reason.clone()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub video_model_path: PathBuf,
    pub audio_model_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub video_model_loaded: bool,
    pub audio_model_loaded: bool,
}

/// Both classifiers, loaded once and read-only afterwards.
pub struct ModelRegistry {
    video: ModelSlot<dyn FrameClassifier>,
    audio: ModelSlot<dyn FeatureClassifier>,
}

impl ModelRegistry {
    pub fn new(
        video: ModelSlot<dyn FrameClassifier>,
        audio: ModelSlot<dyn FeatureClassifier>,
    ) -> Self {
        Self { video, audio }
    }

    /// Loads both artifacts. A failed load marks that modality unavailable and
    /// leaves the other one serving.
    pub fn load(loader: &dyn ClassifierLoaderPort, artifacts: &ModelArtifacts) -> Self {
        let video = match loader.load_frame_classifier(&artifacts.video_model_path) {
            Ok(model) => {
                tracing::info!(path = %artifacts.video_model_path.display(), "video model loaded");
                ModelSlot::Ready(model)
            }
            Err(err) => {
                tracing::warn!(
                    path = %artifacts.video_model_path.display(),
                    error = %err,
                    "video model failed to load; video detection disabled"
                );
                ModelSlot::unavailable(load_failure_reason(err))
            }
        };

        let audio = match loader.load_feature_classifier(&artifacts.audio_model_path) {
            Ok(model) => {
                tracing::info!(path = %artifacts.audio_model_path.display(), "audio model loaded");
                ModelSlot::Ready(model)
            }
            Err(err) => {
                tracing::warn!(
                    path = %artifacts.audio_model_path.display(),
                    error = %err,
                    "audio model failed to load; audio detection disabled"
                );
                ModelSlot::unavailable(load_failure_reason(err))
            }
        };

        Self::new(video, audio)
    }

    pub fn video_classifier(&self) -> Result<Arc<dyn FrameClassifier>, DomainError> {
        self.video.require(Modality::Video)
    }

    pub fn audio_classifier(&self) -> Result<Arc<dyn FeatureClassifier>, DomainError> {
        self.audio.require(Modality::Audio)
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            video_model_loaded: self.video.is_ready(),
            audio_model_loaded: self.audio.is_ready(),
        }
    }
}

fn load_failure_reason(error: DomainError) -> String {
    match error {
        DomainError::ModelUnavailable { reason, .. } => reason,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use detection_domain::{Frame, FrameSize};

    use super::*;

    struct ConstantFrames;

    impl FrameClassifier for ConstantFrames {
        fn score_frames(&self, frames: &[Frame], _size: FrameSize) -> Result<Vec<f32>, DomainError> {
            Ok(vec![0.5; frames.len()])
        }
    }

    struct VideoOnlyLoader;

    impl ClassifierLoaderPort for VideoOnlyLoader {
        fn load_frame_classifier(
            &self,
            _path: &Path,
        ) -> Result<Arc<dyn FrameClassifier>, DomainError> {
            Ok(Arc::new(ConstantFrames))
        }

        fn load_feature_classifier(
            &self,
            path: &Path,
        ) -> Result<Arc<dyn FeatureClassifier>, DomainError> {
            Err(DomainError::model_unavailable(
                Modality::Audio,
                format!("{} not found", path.display()),
            ))
        }
    }

    #[test]
    fn failed_load_disables_only_that_modality() {
        let registry = ModelRegistry::load(
            &VideoOnlyLoader,
            &ModelArtifacts {
                video_model_path: PathBuf::from("models/video.onnx"),
                audio_model_path: PathBuf::from("models/audio.onnx"),
            },
        );

        assert!(registry.video_classifier().is_ok());
        let err = match registry.audio_classifier() {
            Ok(_) => panic!("audio should be unavailable"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            DomainError::ModelUnavailable {
                modality: Modality::Audio,
                ..
            }
        ));
        assert!(err.to_string().contains("models/audio.onnx not found"));
        assert_eq!(
            registry.status(),
            ModelStatus {
                video_model_loaded: true,
                audio_model_loaded: false,
            }
        );
    }
}
