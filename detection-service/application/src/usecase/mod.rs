mod detect_deepfake;

pub use detect_deepfake::{DetectDeepfakeUseCase, DetectDeepfakeUseCaseImpl, DetectionSettings};
