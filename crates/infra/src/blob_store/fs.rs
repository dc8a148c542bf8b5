use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::r#trait::{BlobStore, BlobStoreError, validate_key};

const PARTIAL_SUFFIX: &str = ".partial";

/// Directory-backed bucket: object `a/b` lives at `<root>/a/b`.
///
/// Uploads are written to a uniquely named `.partial` sibling and renamed into
/// place, so readers never see half-written objects.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload_from_file(&self, key: &str, src: &Path) -> Result<(), BlobStoreError> {
        let target = self.path_for(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobStoreError::from_io(key, e))?;
        }

        let mut partial = target.clone().into_os_string();
        partial.push(format!(".{}{PARTIAL_SUFFIX}", Uuid::now_v7().simple()));
        let partial = PathBuf::from(partial);

        if let Err(e) = tokio::fs::copy(src, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(BlobStoreError::from_io(key, e));
        }
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(BlobStoreError::from_io(key, e));
        }

        tracing::debug!(key, "object uploaded");
        Ok(())
    }

    async fn download_to_file(&self, key: &str, dest: &Path) -> Result<(), BlobStoreError> {
        let source = self.path_for(key)?;
        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| BlobStoreError::from_io(key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        let mut keys = Vec::new();
        let mut pending: Vec<(PathBuf, String)> = vec![(self.root.clone(), String::new())];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // An empty bucket may not have been created yet.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && rel.is_empty() => {
                    return Ok(keys);
                }
                Err(e) => return Err(BlobStoreError::from_io(&rel, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| BlobStoreError::from_io(&rel, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = if rel.is_empty() {
                    name.clone()
                } else {
                    format!("{rel}/{name}")
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| BlobStoreError::from_io(&key, e))?;

                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if !name.ends_with(PARTIAL_SUFFIX) && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn staged(bytes: &[u8]) -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(f.path(), bytes).await.unwrap();
        f
    }

    #[tokio::test]
    async fn roundtrip_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let src = staged(b"v1").await;
        store.upload_from_file("expcat/vocab-t1", src.path()).await.unwrap();
        let src = staged(b"v2").await;
        store.upload_from_file("expcat/vocab-t1", src.path()).await.unwrap();

        let dest = tempfile::NamedTempFile::new().unwrap();
        store.download_to_file("expcat/vocab-t1", dest.path()).await.unwrap();
        assert_eq!(tokio::fs::read(dest.path()).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn lists_nested_keys_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let src = staged(b"x").await;
        for key in ["expcat/expcat-b", "expcat/expcat-a", "expcat/vocab-a", "20240101-expenses"] {
            store.upload_from_file(key, src.path()).await.unwrap();
        }

        assert_eq!(
            store.list("expcat/expcat-").await.unwrap(),
            vec!["expcat/expcat-a", "expcat/expcat-b"]
        );
        assert_eq!(store.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_bucket_lists_empty_and_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("not-created"));
        assert!(store.list("").await.unwrap().is_empty());

        let dest = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            store.download_to_file("expcat/expcat-x", dest.path()).await,
            Err(BlobStoreError::NotFound("expcat/expcat-x".into()))
        );
    }
}
