//! Training data snapshots.
//!
//! The backup bucket holds dated exports named `YYYYMMDD-expenses` (optionally
//! with a `.json` suffix), one JSON expense record per line. Training always
//! reads the most recent export.

use std::io::{BufRead, BufReader};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use expcat_core::{ExpcatError, ExpenseRecord, TrainingExample};

use crate::blob_store::BlobStore;
use crate::retry::RetryPolicy;

const PROGRESS_EVERY: usize = 1000;

static SNAPSHOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*/)?(\d{8})-expenses(?:\.json)?$").expect("snapshot name pattern compiles")
});

/// Source of the labelled corpus for a training run.
#[async_trait]
pub trait TrainingDataSource: Send + Sync {
    async fn load_training_data(&self) -> Result<Vec<TrainingExample>, ExpcatError>;
}

#[async_trait]
impl<S: TrainingDataSource + ?Sized> TrainingDataSource for std::sync::Arc<S> {
    async fn load_training_data(&self) -> Result<Vec<TrainingExample>, ExpcatError> {
        (**self).load_training_data().await
    }
}

/// Picks the newest snapshot key from a listing, by embedded date then key.
pub fn latest_snapshot<'a>(keys: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    keys.into_iter()
        .filter_map(|key| {
            let caps = SNAPSHOT_NAME.captures(key)?;
            let date = caps.get(1)?.as_str();
            Some((date, key))
        })
        .max()
        .map(|(_, key)| key)
}

/// Reads the newest snapshot from a blob store.
pub struct BlobSnapshotSource<B> {
    blobs: B,
    prefix: String,
    retry: RetryPolicy,
}

impl<B: BlobStore> BlobSnapshotSource<B> {
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            prefix: String::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Only consider keys under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl<B: BlobStore> TrainingDataSource for BlobSnapshotSource<B> {
    async fn load_training_data(&self) -> Result<Vec<TrainingExample>, ExpcatError> {
        let keys = self
            .retry
            .run("list", || self.blobs.list(&self.prefix))
            .await
            .map_err(|e| ExpcatError::upstream(format!("listing snapshots: {e}")))?;

        let key = latest_snapshot(keys.iter().map(String::as_str))
            .ok_or_else(|| ExpcatError::not_found("no expense snapshot in backup bucket"))?
            .to_string();
        info!(snapshot = %key, "loading training snapshot");

        let staging = NamedTempFile::new()
            .map_err(|e| ExpcatError::upstream(format!("cannot create staging file: {e}")))?;
        self.retry
            .run("download", || self.blobs.download_to_file(&key, staging.path()))
            .await?;

        let owned_key = key.clone();
        let examples = tokio::task::spawn_blocking(move || parse_snapshot(&owned_key, staging))
            .await
            .map_err(|e| ExpcatError::upstream(format!("{key}: parse task failed: {e}")))??;

        info!(snapshot = %key, examples = examples.len(), "training snapshot loaded");
        Ok(examples)
    }
}

fn parse_snapshot(key: &str, staging: NamedTempFile) -> Result<Vec<TrainingExample>, ExpcatError> {
    let file = staging
        .reopen()
        .map_err(|e| ExpcatError::upstream(format!("reading staged {key}: {e}")))?;
    parse_records(key, BufReader::new(file))
}

/// Parse newline-delimited expense records.
///
/// Blank lines are skipped. A line that is not JSON fails the whole snapshot;
/// a well-formed record without a usable user or category is dropped.
pub fn parse_records<R: BufRead>(source: &str, reader: R) -> Result<Vec<TrainingExample>, ExpcatError> {
    let mut examples = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| ExpcatError::upstream(format!("{source}:{line_no}: {e}")))?;
        if line_no % PROGRESS_EVERY == 0 {
            info!(snapshot = source, lines = line_no, "reading snapshot");
        }
        if line.trim().is_empty() {
            continue;
        }

        let record: ExpenseRecord = serde_json::from_str(&line)
            .map_err(|e| ExpcatError::invalid_input(format!("{source}:{line_no}: {e}")))?;
        match TrainingExample::try_from(record) {
            Ok(example) => examples.push(example),
            Err(e) => {
                skipped += 1;
                warn!(snapshot = source, line = line_no, error = %e, "skipping expense record");
            }
        }
    }

    if skipped > 0 {
        warn!(snapshot = source, skipped, "snapshot had unusable records");
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::InMemoryBlobStore;
    use std::sync::Arc;

    #[test]
    fn picks_newest_dated_snapshot() {
        let keys = [
            "20240101-expenses",
            "20240315-expenses.json",
            "20240301-expenses",
            "20250101-notes",
            "latest-expenses",
        ];
        assert_eq!(latest_snapshot(keys), Some("20240315-expenses.json"));
        assert_eq!(latest_snapshot(["backups/20231231-expenses"]), Some("backups/20231231-expenses"));
        assert_eq!(latest_snapshot(["readme.txt"]), None);
    }

    #[test]
    fn parses_lines_and_skips_blanks_and_bad_records() {
        let body = concat!(
            r#"{"user":"t1","description":"pizza","category":"food"}"#,
            "\n\n",
            r#"{"user":"t1","category":"misc"}"#,
            "\n",
            r#"{"user":"t1","description":"bus","category":"  "}"#,
            "\n",
            r#"{"user":"t2","description":"taxi","category":"transport"}"#,
            "\n",
        );
        let examples = parse_records("snap", body.as_bytes()).unwrap();
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].description, "pizza");
        assert_eq!(examples[1].description, "");
        assert_eq!(examples[2].tenant_id.as_str(), "t2");
    }

    #[test]
    fn malformed_line_names_its_position() {
        let body = "{\"user\":\"t1\",\"description\":\"a\",\"category\":\"b\"}\n{oops\n";
        let err = parse_records("snap", body.as_bytes()).unwrap_err();
        match err {
            ExpcatError::InvalidInput(msg) => assert!(msg.starts_with("snap:2:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn loads_latest_snapshot_from_bucket() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs.put_bytes(
            "20240101-expenses",
            r#"{"user":"t1","description":"old","category":"x"}"#,
        );
        blobs.put_bytes(
            "20240201-expenses",
            r#"{"user":"t1","description":"new","category":"y"}"#,
        );

        let examples = BlobSnapshotSource::new(blobs).load_training_data().await.unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].description, "new");
    }

    #[tokio::test]
    async fn empty_bucket_is_not_found() {
        let source = BlobSnapshotSource::new(Arc::new(InMemoryBlobStore::new()));
        assert!(matches!(
            source.load_training_data().await,
            Err(ExpcatError::NotFound(_))
        ));
    }
}
