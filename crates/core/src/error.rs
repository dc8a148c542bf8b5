//! Error taxonomy shared by every layer.

use thiserror::Error;

/// Result type used across the categorizer.
pub type ExpcatResult<T> = Result<T, ExpcatError>;

/// Categorizer error surfaced to callers.
///
/// Crate-local errors (classifier, blob storage, snapshots) convert into this
/// enum so the HTTP adapter only has to map one taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpcatError {
    /// No model (or artifact) exists for the requested tenant.
    #[error("not found: {0}")]
    NotFound(String),

    /// A persisted artifact could not be decoded, or a classifier/vocabulary
    /// pair does not belong together.
    #[error("corrupt artifact: {0}")]
    Corrupt(String),

    /// A training run is already in flight.
    #[error("training already running")]
    Busy,

    /// Malformed request payload or configuration value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Object storage or data source failure.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Retryable network fault.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl ExpcatError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Stable snake_case code, used in JSON error bodies and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ExpcatError::NotFound(_) => "not_found",
            ExpcatError::Corrupt(_) => "corrupt",
            ExpcatError::Busy => "busy",
            ExpcatError::InvalidInput(_) => "invalid_input",
            ExpcatError::UpstreamUnavailable(_) => "upstream_unavailable",
            ExpcatError::Transient(_) => "transient",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ExpcatError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(ExpcatError::transient("reset").is_retryable());
        assert!(!ExpcatError::upstream("down").is_retryable());
        assert!(!ExpcatError::Busy.is_retryable());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExpcatError::not_found("t1").code(), "not_found");
        assert_eq!(ExpcatError::Busy.code(), "busy");
        assert_eq!(ExpcatError::corrupt("x").to_string(), "corrupt artifact: x");
    }
}
