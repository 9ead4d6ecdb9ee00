//! Error types for the churn core

use thiserror::Error;

/// Errors that can occur while preparing, encoding, fitting or loading models
#[derive(Error, Debug)]
pub enum CoreError {
    /// A field the encoder was fit on is absent from the record
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field is present but carries a value of the wrong shape
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// A categorical value outside the fitted vocabulary (only raised when asked to)
    #[error("unknown value {value:?} for field {field}")]
    UnknownCategory { field: String, value: String },

    /// A configured column is not present in the dataset header
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A data row has a different number of cells than the header
    #[error("row {row}: expected {expected} cells, got {actual}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Fitting was attempted on no data
    #[error("dataset is empty")]
    EmptyDataset,

    /// Target values are unusable for the requested estimator
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Estimator hyper-parameter out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Vector length does not match the fitted layout
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Normal equations could not be solved
    #[error("singular matrix at column {0}")]
    SingularMatrix(usize),

    /// Inference produced NaN or infinity
    #[error("non-finite prediction")]
    NonFinite,

    /// Artifact bytes could not be decoded into an (encoder, estimator) pair
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid_field<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's record rather than by the model.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::MissingField(_)
                | CoreError::InvalidField { .. }
                | CoreError::UnknownCategory { .. }
        )
    }
}

/// Result type for churn core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(CoreError::MissingField("tenure".into()).is_input_error());
        assert!(CoreError::invalid_field("tenure", "not a number").is_input_error());
        assert!(CoreError::UnknownCategory {
            field: "contract".into(),
            value: "weekly".into()
        }
        .is_input_error());
        assert!(!CoreError::NonFinite.is_input_error());
        assert!(!CoreError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
        .is_input_error());
    }

    #[test]
    fn messages_name_the_field() {
        let err = CoreError::MissingField("contract".into());
        assert_eq!(err.to_string(), "missing field: contract");
    }
}
