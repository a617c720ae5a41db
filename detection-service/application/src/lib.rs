mod dto;
mod error;
mod registry;
mod usecase;

pub use dto::*;
pub use error::ApplicationError;
pub use registry::{ModelArtifacts, ModelRegistry, ModelSlot, ModelStatus};
pub use usecase::*;
