//! Training orchestration: snapshot → per-tenant jobs → artifacts → cache swap.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use expcat_ai::{AiError, AiJob, Classifier, TenantTrainingJob, Tokenizer, TrainingParams};
use expcat_core::{AccuracyReport, ExpcatError, TenantAccuracy, TenantId, TrainingExample, TrainingRunId};

use crate::blob_store::BlobStore;
use crate::model_cache::{ModelCache, ModelRegistry};
use crate::model_store::ModelStore;
use crate::snapshot::TrainingDataSource;

/// Runs training for every tenant in the latest snapshot.
///
/// At most one run is in flight; a second caller gets `Busy` immediately.
/// Serving keeps using the previous cache until the run has saved its
/// artifacts and a complete replacement registry has been loaded.
pub struct TrainingOrchestrator<D, B, C, F> {
    source: D,
    store: Arc<ModelStore<B>>,
    cache: Arc<ModelCache<C>>,
    tokenizer: Arc<Tokenizer>,
    params: TrainingParams,
    new_classifier: F,
    in_flight: Mutex<()>,
}

impl<D, B, C, F> TrainingOrchestrator<D, B, C, F>
where
    D: TrainingDataSource,
    B: BlobStore,
    C: Classifier + Serialize + DeserializeOwned + 'static,
    F: Fn() -> C + Send + Sync,
{
    /// `new_classifier` produces a fresh, unfitted classifier per tenant.
    pub fn new(
        source: D,
        store: Arc<ModelStore<B>>,
        cache: Arc<ModelCache<C>>,
        tokenizer: Arc<Tokenizer>,
        new_classifier: F,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            tokenizer,
            params: TrainingParams::default(),
            new_classifier,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_params(mut self, params: TrainingParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Train every tenant found in the latest snapshot.
    ///
    /// A tenant that fails is recorded in the report and does not stop the
    /// others. Errors returned here mean the run could not start at all.
    pub async fn train_all(&self) -> Result<AccuracyReport, ExpcatError> {
        let _running = self.in_flight.try_lock().map_err(|_| ExpcatError::Busy)?;

        let run_id = TrainingRunId::new();
        let started = Instant::now();
        info!(run = %run_id, "training run started");

        let examples = self.source.load_training_data().await?;
        let by_tenant = group_by_tenant(examples);

        let mut report = AccuracyReport::new(run_id);
        for (tenant_id, examples) in by_tenant {
            let count = examples.len();
            match self.train_tenant(tenant_id.clone(), run_id, examples).await {
                Ok(acc) => {
                    info!(
                        tenant = %tenant_id,
                        examples = count,
                        train_accuracy = acc.train_accuracy,
                        test_accuracy = acc.test_accuracy,
                        "tenant trained"
                    );
                    report.record_trained(tenant_id, acc);
                }
                Err(e) => {
                    warn!(tenant = %tenant_id, examples = count, error = %e, code = e.code(), "tenant training failed");
                    report.record_failure(tenant_id, e.to_string());
                }
            }
        }

        if let Err(e) = self.reload().await {
            error!(run = %run_id, error = %e, "reload after training failed; serving previous models");
        }

        info!(
            run = %run_id,
            trained = report.trained_count(),
            failed = report.failed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training run finished"
        );
        Ok(report)
    }

    /// Run `train_all` on its own task.
    ///
    /// Dropping the returned handle does not cancel the run, so a caller that
    /// goes away cannot interrupt a tenant between its two artifact uploads.
    pub fn spawn_train_all(self: Arc<Self>) -> JoinHandle<Result<AccuracyReport, ExpcatError>>
    where
        D: 'static,
        B: 'static,
        F: 'static,
    {
        tokio::spawn(async move { self.train_all().await })
    }

    /// Load every persisted model and swap it into the cache in one step.
    ///
    /// Returns the number of tenants now served. On error the cache is left
    /// untouched.
    pub async fn reload(&self) -> Result<usize, ExpcatError> {
        let models = self.store.load_all::<C>().await?;
        let count = models.len();
        self.cache.replace(ModelRegistry::new(models));
        Ok(count)
    }

    async fn train_tenant(
        &self,
        tenant_id: TenantId,
        run_id: TrainingRunId,
        examples: Vec<TrainingExample>,
    ) -> Result<TenantAccuracy, ExpcatError> {
        let job = TenantTrainingJob::new(
            tenant_id,
            run_id,
            examples,
            self.tokenizer.clone(),
            self.params.clone(),
            (self.new_classifier)(),
        );

        let model = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| AiError::FitFailed(format!("training job aborted: {e}")))??;

        self.store.save_model(&model).await?;
        Ok(model.accuracy)
    }
}

/// Partition examples by tenant, keeping snapshot order within a tenant.
pub fn group_by_tenant(examples: Vec<TrainingExample>) -> BTreeMap<TenantId, Vec<TrainingExample>> {
    let mut groups: BTreeMap<TenantId, Vec<TrainingExample>> = BTreeMap::new();
    for example in examples {
        groups.entry(example.tenant_id.clone()).or_default().push(example);
    }
    groups
}
