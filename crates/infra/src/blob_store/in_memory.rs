use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::r#trait::{BlobStore, BlobStoreError, validate_key};

/// In-memory bucket for tests/dev.
///
/// Supports scripted failures: `fail_next` queues errors that the next
/// operations return (in order) before touching any object, and
/// `fail_uploads_to` / `delay_uploads_to` target uploads of one key.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    failures: Mutex<VecDeque<BlobStoreError>>,
    upload_faults: Mutex<BTreeMap<String, BlobStoreError>>,
    upload_delays: Mutex<BTreeMap<String, Duration>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bytes(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut map) = self.objects.write() {
            map.insert(key.into(), bytes.into());
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        match self.objects.read() {
            Ok(map) => map.keys().cloned().collect(),
            Err(_) => vec![],
        }
    }

    pub fn fail_next(&self, err: BlobStoreError) {
        if let Ok(mut q) = self.failures.lock() {
            q.push_back(err);
        }
    }

    /// Every upload to `key` fails with `err` until `clear_upload_faults`.
    pub fn fail_uploads_to(&self, key: impl Into<String>, err: BlobStoreError) {
        if let Ok(mut faults) = self.upload_faults.lock() {
            faults.insert(key.into(), err);
        }
    }

    pub fn clear_upload_faults(&self) {
        if let Ok(mut faults) = self.upload_faults.lock() {
            faults.clear();
        }
    }

    /// Every upload to `key` sleeps for `delay` before writing.
    pub fn delay_uploads_to(&self, key: impl Into<String>, delay: Duration) {
        if let Ok(mut delays) = self.upload_delays.lock() {
            delays.insert(key.into(), delay);
        }
    }

    fn take_failure(&self) -> Result<(), BlobStoreError> {
        match self.failures.lock().ok().and_then(|mut q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload_from_file(&self, key: &str, src: &Path) -> Result<(), BlobStoreError> {
        self.take_failure()?;
        validate_key(key)?;
        let delay = self.upload_delays.lock().ok().and_then(|d| d.get(key).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fault = self.upload_faults.lock().ok().and_then(|f| f.get(key).cloned());
        if let Some(err) = fault {
            return Err(err);
        }
        let bytes = tokio::fs::read(src)
            .await
            .map_err(|e| BlobStoreError::from_io(key, e))?;
        self.put_bytes(key, bytes);
        Ok(())
    }

    async fn download_to_file(&self, key: &str, dest: &Path) -> Result<(), BlobStoreError> {
        self.take_failure()?;
        validate_key(key)?;
        let bytes = self
            .get_bytes(key)
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))?;
        tokio::fs::write(dest, bytes)
            .await
            .map_err(|e| BlobStoreError::from_io(key, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        self.take_failure()?;
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}
