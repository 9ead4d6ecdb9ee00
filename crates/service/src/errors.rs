//! Service error types

use churn_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the prediction service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request body is not a usable record; the message names the field.
    #[error("{0}")]
    InputValidation(String),

    #[error("failed to load model artifact from {path}: {source}")]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("failed to hash model artifact: {0}")]
    ModelHash(#[source] CoreError),

    #[error("inference failed: {0}")]
    Inference(#[source] CoreError),

    #[error("model unavailable")]
    ModelUnavailable,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        if err.is_input_error() {
            ServiceError::InputValidation(err.to_string())
        } else {
            ServiceError::Inference(err)
        }
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_input_errors_become_validation_errors() {
        let err: ServiceError = CoreError::MissingField("tenure".into()).into();
        assert!(matches!(err, ServiceError::InputValidation(ref msg) if msg.contains("tenure")));

        let err: ServiceError = CoreError::NonFinite.into();
        assert!(matches!(err, ServiceError::Inference(_)));
    }
}
