mod detect_deepfake;

pub use detect_deepfake::{AudioDetectionResponse, DetectDeepfakeRequest, VideoDetectionResponse};
