use std::path::Path;
use std::sync::Arc;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use detection_domain::{
    ClassifierLoaderPort, DomainError, FeatureClassifier, FrameClassifier, Modality,
};

use crate::{OnnxFeatureClassifier, OnnxFrameClassifier};

#[derive(Debug, Clone)]
pub struct OnnxLoaderConfig {
    pub audio_probability_output: usize,
    pub intra_threads: Option<usize>,
}

impl Default for OnnxLoaderConfig {
    fn default() -> Self {
        Self {
            audio_probability_output: 1,
            intra_threads: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OnnxClassifierLoader {
    config: OnnxLoaderConfig,
}

impl OnnxClassifierLoader {
    pub fn new(config: OnnxLoaderConfig) -> Self {
        Self { config }
    }

    fn open_session(&self, modality: Modality, path: &Path) -> Result<Session, DomainError> {
        if !path.is_file() {
            return Err(DomainError::model_unavailable(
                modality,
                format!("{}: model file not found", path.display()),
            ));
        }

        let mut builder = Session::builder()
            .map_err(|err| unavailable(modality, path, err))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|err| unavailable(modality, path, err))?;
        if let Some(threads) = self.config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|err| unavailable(modality, path, err))?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|err| unavailable(modality, path, err))?;

        tracing::debug!(
            %modality,
            path = %path.display(),
            "onnx session ready"
        );
        Ok(session)
    }
}

fn unavailable(modality: Modality, path: &Path, err: impl std::fmt::Display) -> DomainError {
    DomainError::model_unavailable(modality, format!("{}: {err}", path.display()))
}

impl ClassifierLoaderPort for OnnxClassifierLoader {
    fn load_frame_classifier(&self, path: &Path) -> Result<Arc<dyn FrameClassifier>, DomainError> {
        let session = self.open_session(Modality::Video, path)?;
        Ok(Arc::new(OnnxFrameClassifier::new(session)))
    }

    fn load_feature_classifier(
        &self,
        path: &Path,
    ) -> Result<Arc<dyn FeatureClassifier>, DomainError> {
        let session = self.open_session(Modality::Audio, path)?;
        Ok(Arc::new(OnnxFeatureClassifier::new(
            session,
            self.config.audio_probability_output,
        )))
    }
}
