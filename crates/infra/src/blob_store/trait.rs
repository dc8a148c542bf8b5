use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use expcat_core::ExpcatError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Retryable fault (timeouts, resets).
    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl BlobStoreError {
    /// Classify an I/O error raised while touching `key`.
    pub fn from_io(key: &str, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(key.to_string()),
            ErrorKind::TimedOut
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => Self::Transient(format!("{key}: {err}")),
            _ => Self::Unavailable(format!("{key}: {err}")),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BlobStoreError::Transient(_))
    }
}

impl From<BlobStoreError> for ExpcatError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(key) => ExpcatError::not_found(key),
            BlobStoreError::InvalidKey(msg) => ExpcatError::invalid_input(msg),
            BlobStoreError::Transient(msg) => ExpcatError::transient(msg),
            BlobStoreError::Unavailable(msg) => ExpcatError::upstream(msg),
        }
    }
}

/// Durable object storage (bucket-like).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file at `src` as `key`, replacing any existing object.
    async fn upload_from_file(&self, key: &str, src: &Path) -> Result<(), BlobStoreError>;

    /// Download `key` into the (existing) file at `dest`, truncating it.
    async fn download_to_file(&self, key: &str, dest: &Path) -> Result<(), BlobStoreError>;

    /// Keys starting with `prefix`, sorted ascending.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError>;
}

#[async_trait]
impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    async fn upload_from_file(&self, key: &str, src: &Path) -> Result<(), BlobStoreError> {
        (**self).upload_from_file(key, src).await
    }

    async fn download_to_file(&self, key: &str, dest: &Path) -> Result<(), BlobStoreError> {
        (**self).download_to_file(key, dest).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        (**self).list(prefix).await
    }
}

/// Keys must be non-empty relative paths without `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<(), BlobStoreError> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(BlobStoreError::InvalidKey(key.to_string()));
    }
    if key
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(BlobStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(validate_key("expcat/expcat-t1").is_ok());
        assert!(validate_key("20240101-expenses.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("dir/").is_err());
    }

    #[test]
    fn io_errors_are_classified() {
        let nf = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(BlobStoreError::from_io("k", nf), BlobStoreError::NotFound("k".into()));

        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(BlobStoreError::from_io("k", reset).is_transient());

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            BlobStoreError::from_io("k", denied),
            BlobStoreError::Unavailable(_)
        ));
    }

    #[test]
    fn maps_into_core_taxonomy() {
        assert_eq!(
            ExpcatError::from(BlobStoreError::Transient("t".into())),
            ExpcatError::transient("t")
        );
        assert_eq!(
            ExpcatError::from(BlobStoreError::Unavailable("u".into())),
            ExpcatError::upstream("u")
        );
    }
}
