use detection_domain::{DomainError, Modality};
use thiserror::Error;

/// Outcome kinds surfaced to the boundary layer.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{modality} model not loaded: {reason}")]
    ModelUnavailable { modality: Modality, reason: String },

    #[error("could not decode media: {0}")]
    Decode(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ApplicationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApplicationError::ModelUnavailable { .. } => "model_unavailable",
            ApplicationError::Decode(_) => "decode_error",
            ApplicationError::Unexpected(_) => "unexpected_failure",
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::ModelUnavailable { modality, reason } => {
                ApplicationError::ModelUnavailable { modality, reason }
            }
            DomainError::Decode(message) => ApplicationError::Decode(message),
            other @ (DomainError::Classifier(_) | DomainError::Internal(_)) => {
                ApplicationError::Unexpected(other.to_string())
            }
        }
    }
}
