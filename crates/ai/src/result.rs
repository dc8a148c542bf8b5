use thiserror::Error;

use expcat_core::ExpcatError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AiError {
    #[error("invalid job input: {0}")]
    InvalidInput(String),

    #[error("insufficient examples: found {found}, need at least {required}")]
    InsufficientExamples { found: usize, required: usize },

    #[error("fit failed: {0}")]
    FitFailed(String),

    #[error("classifier is not fitted")]
    NotFitted,

    /// Feature vector length differs from the classifier's input dimension.
    #[error("dimension mismatch: classifier expects {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl From<AiError> for ExpcatError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotFitted | AiError::DimensionMismatch { .. } => {
                ExpcatError::corrupt(err.to_string())
            }
            AiError::InvalidInput(_)
            | AiError::InsufficientExamples { .. }
            | AiError::FitFailed(_) => ExpcatError::invalid_input(err.to_string()),
        }
    }
}
