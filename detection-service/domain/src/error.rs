use thiserror::Error;

use crate::Modality;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{modality} model unavailable: {reason}")]
    ModelUnavailable { modality: Modality, reason: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn model_unavailable(modality: Modality, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            modality,
            reason: reason.into(),
        }
    }

    pub fn decode_error(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn classifier_error(message: impl Into<String>) -> Self {
        Self::Classifier(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
