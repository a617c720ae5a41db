use std::path::Path;
use std::sync::Arc;

use crate::{AudioFeatureVector, DomainError, Frame, FrameSize, MediaSource, RawFrame};

/// An opened clip that can hand out frames by index.
///
/// Callers request indices in increasing order; implementations may reject
/// backward seeks.
pub trait VideoStream {
    /// Total decodable frame count as reported by the container.
    fn frame_count(&self) -> usize;
    fn read_frame(&mut self, index: usize) -> Result<RawFrame, DomainError>;
}

pub trait VideoDecoderPort: Send + Sync {
    fn open(&self, source: &MediaSource) -> Result<Box<dyn VideoStream>, DomainError>;
}

pub trait AudioFeatureExtractorPort: Send + Sync {
    fn extract(&self, source: &MediaSource) -> Result<AudioFeatureVector, DomainError>;
}

/// Frame-level binary classifier. Returns one fake probability per frame, in order.
pub trait FrameClassifier: Send + Sync {
    fn score_frames(&self, frames: &[Frame], size: FrameSize) -> Result<Vec<f32>, DomainError>;
}

/// Feature-vector classifier returning a class probability distribution.
pub trait FeatureClassifier: Send + Sync {
    fn predict_proba(&self, features: &AudioFeatureVector) -> Result<Vec<f32>, DomainError>;
}

pub trait ClassifierLoaderPort: Send + Sync {
    fn load_frame_classifier(&self, path: &Path) -> Result<Arc<dyn FrameClassifier>, DomainError>;
    fn load_feature_classifier(
        &self,
        path: &Path,
    ) -> Result<Arc<dyn FeatureClassifier>, DomainError>;
}
