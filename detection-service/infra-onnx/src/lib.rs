mod classifier;
mod loader;

pub use classifier::{OnnxFeatureClassifier, OnnxFrameClassifier};
pub use loader::{OnnxClassifierLoader, OnnxLoaderConfig};
