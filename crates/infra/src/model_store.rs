//! Persistence of per-tenant (classifier, vocabulary) artifacts.
//!
//! ## Layout
//!
//! | Artifact | Key |
//! |----------|-----|
//! | classifier | `expcat/expcat-<name>` |
//! | vocabulary | `expcat/vocab-<name>` |
//!
//! `<name>` is the tenant id unless the tenant has an entry in the configured
//! alias table, in which case the alias is used.
//!
//! ## Staging
//!
//! Every transfer goes through a `tempfile::NamedTempFile`; the file is
//! removed when it drops, on success and on every error path.
//!
//! ## Envelope
//!
//! Both artifacts are JSON envelopes carrying the tenant and the training run
//! id. `load` refuses a pair whose run ids differ.
//!
//! ## Write order
//!
//! `save_model` writes the vocabulary first and the classifier last. The
//! classifier key is what `list_tenants` enumerates, so a new tenant only
//! becomes visible once both halves exist. If the classifier upload fails,
//! the previous vocabulary is written back and the old pair keeps loading.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use expcat_ai::{Classifier, TrainedModel, Vocabulary};
use expcat_core::{ExpcatError, TenantId, TrainingRunId};

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::model_cache::LoadedModel;
use crate::retry::RetryPolicy;

const ARTIFACT_FORMAT: u32 = 1;

/// Object-key naming for model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    prefix: String,
    aliases: BTreeMap<TenantId, String>,
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl ArtifactNaming {
    pub fn new(aliases: BTreeMap<TenantId, String>) -> Self {
        Self {
            prefix: "expcat".to_string(),
            aliases,
        }
    }

    fn name_for<'a>(&'a self, tenant_id: &'a TenantId) -> &'a str {
        self.aliases
            .get(tenant_id)
            .map(String::as_str)
            .unwrap_or_else(|| tenant_id.as_str())
    }

    pub fn classifier_key(&self, tenant_id: &TenantId) -> String {
        format!("{}/expcat-{}", self.prefix, self.name_for(tenant_id))
    }

    pub fn vocabulary_key(&self, tenant_id: &TenantId) -> String {
        format!("{}/vocab-{}", self.prefix, self.name_for(tenant_id))
    }

    fn classifier_prefix(&self) -> String {
        format!("{}/expcat-", self.prefix)
    }

    /// Tenant owning a classifier key (reverse of `classifier_key`).
    pub fn tenant_for_classifier_key(&self, key: &str) -> Option<TenantId> {
        let name = key.strip_prefix(&self.classifier_prefix())?;
        if let Some((tenant, _)) = self.aliases.iter().find(|(_, alias)| alias.as_str() == name) {
            return Some(tenant.clone());
        }
        // An aliased tenant's own-name key is stale; it is never served.
        let tenant = TenantId::new(name).ok()?;
        if self.aliases.contains_key(&tenant) {
            return None;
        }
        Some(tenant)
    }
}

/// Timing metadata for one `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadTiming {
    pub download_ms: u64,
    pub decode_ms: u64,
    pub total_ms: u64,
}

/// Both artifacts of a tenant, as read back from storage.
#[derive(Debug)]
pub struct LoadedArtifacts<C> {
    pub run_id: TrainingRunId,
    pub classifier: C,
    pub vocabulary: Vocabulary,
    pub timing: LoadTiming,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format: u32,
    tenant_id: TenantId,
    run_id: TrainingRunId,
    saved_at: DateTime<Utc>,
    payload: T,
}

pub struct ModelStore<B> {
    blobs: B,
    naming: ArtifactNaming,
    retry: RetryPolicy,
}

impl<B: BlobStore> ModelStore<B> {
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            naming: ArtifactNaming::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_naming(mut self, naming: ArtifactNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn naming(&self) -> &ArtifactNaming {
        &self.naming
    }

    /// Persist a classifier, replacing any previous one for the tenant.
    pub async fn save<C: Serialize>(
        &self,
        tenant_id: &TenantId,
        run_id: TrainingRunId,
        classifier: &C,
    ) -> Result<(), ExpcatError> {
        let key = self.naming.classifier_key(tenant_id);
        self.put(&key, tenant_id, run_id, classifier).await
    }

    /// Persist a vocabulary, replacing any previous one for the tenant.
    pub async fn save_vocabulary(
        &self,
        tenant_id: &TenantId,
        run_id: TrainingRunId,
        vocabulary: &Vocabulary,
    ) -> Result<(), ExpcatError> {
        let key = self.naming.vocabulary_key(tenant_id);
        self.put(&key, tenant_id, run_id, vocabulary).await
    }

    /// Persist both halves of a trained model under its run id.
    pub async fn save_model<C: Serialize>(&self, model: &TrainedModel<C>) -> Result<(), ExpcatError> {
        let tenant_id = &model.tenant_id;
        let vocab_key = self.naming.vocabulary_key(tenant_id);
        let previous = self.stash(&vocab_key).await?;

        self.save_vocabulary(tenant_id, model.run_id, &model.vocabulary)
            .await?;
        if let Err(e) = self.save(tenant_id, model.run_id, &model.classifier).await {
            self.restore(&vocab_key, previous).await;
            return Err(e);
        }

        info!(tenant = %tenant_id, run = %model.run_id, "model artifacts saved");
        Ok(())
    }

    /// Copy of the object at `key` in a staging file, `None` if absent.
    async fn stash(&self, key: &str) -> Result<Option<NamedTempFile>, ExpcatError> {
        let staging = new_staging_file()?;
        match self
            .retry
            .run("download", || self.blobs.download_to_file(key, staging.path()))
            .await
        {
            Ok(()) => Ok(Some(staging)),
            Err(BlobStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn restore(&self, key: &str, previous: Option<NamedTempFile>) {
        // Without a previous object the new one is an orphan nobody lists.
        let Some(previous) = previous else {
            return;
        };
        match self
            .retry
            .run("upload", || self.blobs.upload_from_file(key, previous.path()))
            .await
        {
            Ok(()) => warn!(key = %key, "restored previous artifact after failed save"),
            Err(e) => error!(key = %key, error = %e, "could not restore previous artifact"),
        }
    }

    /// Tenants that have a persisted classifier.
    pub async fn list_tenants(&self) -> Result<BTreeSet<TenantId>, ExpcatError> {
        let prefix = self.naming.classifier_prefix();
        let keys = self
            .retry
            .run("list", || self.blobs.list(&prefix))
            .await?;

        Ok(keys
            .iter()
            .filter_map(|key| {
                let tenant = self.naming.tenant_for_classifier_key(key);
                if tenant.is_none() {
                    debug!(key = %key, "ignoring unrecognized artifact key");
                }
                tenant
            })
            .collect())
    }

    /// Load both artifacts of one tenant.
    ///
    /// `NotFound` if either is missing, `Corrupt` if either fails to decode or
    /// the two come from different training runs.
    pub async fn load<C>(&self, tenant_id: &TenantId) -> Result<LoadedArtifacts<C>, ExpcatError>
    where
        C: DeserializeOwned + Send + 'static,
    {
        let started = Instant::now();

        let (classifier, c_dl, c_dec) = self
            .fetch::<C>(&self.naming.classifier_key(tenant_id), tenant_id)
            .await?;
        let (vocabulary, v_dl, v_dec) = self
            .fetch::<Vocabulary>(&self.naming.vocabulary_key(tenant_id), tenant_id)
            .await?;

        if classifier.run_id != vocabulary.run_id {
            return Err(ExpcatError::corrupt(format!(
                "tenant {tenant_id}: classifier from run {} but vocabulary from run {}",
                classifier.run_id, vocabulary.run_id
            )));
        }

        let timing = LoadTiming {
            download_ms: millis(c_dl + v_dl),
            decode_ms: millis(c_dec + v_dec),
            total_ms: millis(started.elapsed()),
        };
        debug!(tenant = %tenant_id, ?timing, "model artifacts loaded");

        Ok(LoadedArtifacts {
            run_id: classifier.run_id,
            classifier: classifier.payload,
            vocabulary: vocabulary.payload,
            timing,
        })
    }

    /// Load every tenant's model for cache warm-up.
    ///
    /// A tenant whose artifacts fail to load is skipped and logged; the others
    /// still load. Only a failure to enumerate tenants is returned as an error.
    pub async fn load_all<C>(&self) -> Result<HashMap<TenantId, Arc<LoadedModel<C>>>, ExpcatError>
    where
        C: Classifier + DeserializeOwned + 'static,
    {
        let tenants = self.list_tenants().await?;
        let mut models = HashMap::with_capacity(tenants.len());

        for tenant_id in tenants {
            let loaded = match self.load::<C>(&tenant_id).await {
                Ok(a) => LoadedModel::new(tenant_id.clone(), a.run_id, a.classifier, a.vocabulary),
                Err(e) => Err(e),
            };
            match loaded {
                Ok(model) => {
                    models.insert(tenant_id, Arc::new(model));
                }
                Err(e) => {
                    warn!(tenant = %tenant_id, error = %e, code = e.code(), "skipping tenant during model load");
                }
            }
        }

        info!(models = models.len(), "model cache loaded");
        Ok(models)
    }

    async fn put<T: Serialize>(
        &self,
        key: &str,
        tenant_id: &TenantId,
        run_id: TrainingRunId,
        payload: &T,
    ) -> Result<(), ExpcatError> {
        let envelope = Envelope {
            format: ARTIFACT_FORMAT,
            tenant_id: tenant_id.clone(),
            run_id,
            saved_at: Utc::now(),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| ExpcatError::invalid_input(format!("{key}: cannot serialize: {e}")))?;

        let staging = new_staging_file()?;
        tokio::fs::write(staging.path(), &bytes)
            .await
            .map_err(|e| ExpcatError::upstream(format!("staging {key}: {e}")))?;

        self.retry
            .run("upload", || self.blobs.upload_from_file(key, staging.path()))
            .await?;
        Ok(())
    }

    async fn fetch<T>(
        &self,
        key: &str,
        tenant_id: &TenantId,
    ) -> Result<(Envelope<T>, Duration, Duration), ExpcatError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let staging = new_staging_file()?;

        let started = Instant::now();
        self.retry
            .run("download", || self.blobs.download_to_file(key, staging.path()))
            .await?;
        let download = started.elapsed();

        let started = Instant::now();
        let owned_key = key.to_string();
        let envelope = tokio::task::spawn_blocking(move || decode::<T>(&owned_key, staging))
            .await
            .map_err(|e| ExpcatError::corrupt(format!("{key}: decode task failed: {e}")))??;
        let decode_time = started.elapsed();

        if envelope.format != ARTIFACT_FORMAT {
            return Err(ExpcatError::corrupt(format!(
                "{key}: unsupported artifact format {}",
                envelope.format
            )));
        }
        if &envelope.tenant_id != tenant_id {
            return Err(ExpcatError::corrupt(format!(
                "{key}: artifact belongs to tenant {}",
                envelope.tenant_id
            )));
        }

        Ok((envelope, download, decode_time))
    }
}

/// Runs on the blocking pool; `staging` is removed when it drops here.
fn decode<T: DeserializeOwned>(key: &str, staging: NamedTempFile) -> Result<Envelope<T>, ExpcatError> {
    let bytes = std::fs::read(staging.path())
        .map_err(|e| ExpcatError::upstream(format!("reading staged {key}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ExpcatError::corrupt(format!("{key}: {e}")))
}

fn new_staging_file() -> Result<NamedTempFile, ExpcatError> {
    NamedTempFile::new().map_err(|e| ExpcatError::upstream(format!("cannot create staging file: {e}")))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
