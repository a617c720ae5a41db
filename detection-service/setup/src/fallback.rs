use std::path::Path;
use std::sync::Arc;

use detection_domain::{
    ClassifierLoaderPort, DomainError, FeatureClassifier, FrameClassifier, MediaSource, Modality,
    VideoDecoderPort, VideoStream,
};

/// Stands in for the ONNX loader when the service is built without `onnx-runtime`.
pub struct UnavailableClassifierLoader;

impl ClassifierLoaderPort for UnavailableClassifierLoader {
    fn load_frame_classifier(&self, path: &Path) -> Result<Arc<dyn FrameClassifier>, DomainError> {
        Err(runtime_missing(Modality::Video, path))
    }

    fn load_feature_classifier(
        &self,
        path: &Path,
    ) -> Result<Arc<dyn FeatureClassifier>, DomainError> {
        Err(runtime_missing(Modality::Audio, path))
    }
}

fn runtime_missing(modality: Modality, path: &Path) -> DomainError {
    DomainError::model_unavailable(
        modality,
        format!(
            "{}: service built without the `onnx-runtime` feature",
            path.display()
        ),
    )
}

/// Stands in for the FFmpeg decoder when the service is built without `ffmpeg-runtime`.
pub struct UnavailableVideoDecoder;

impl VideoDecoderPort for UnavailableVideoDecoder {
    fn open(&self, _source: &MediaSource) -> Result<Box<dyn VideoStream>, DomainError> {
        Err(DomainError::internal_error(
            "video decoding requires the `ffmpeg-runtime` feature",
        ))
    }
}
