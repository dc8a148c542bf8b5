use std::sync::Arc;

use expcat_ai::{BernoulliNaiveBayes, Tokenizer};
use expcat_core::{AccuracyReport, ExpcatError, TenantId};
use expcat_infra::{
    ArtifactNaming, BlobSnapshotSource, ExpcatConfig, InferenceEngine, ModelCache, ModelStore,
    TrainingDataSource, TrainingOrchestrator, blob_store::BlobStore,
};

/// Classifier served by this deployment.
pub type ExpenseClassifier = BernoulliNaiveBayes;

type ClassifierFactory = fn() -> ExpenseClassifier;

type Orchestrator = TrainingOrchestrator<
    Arc<dyn TrainingDataSource>,
    Arc<dyn BlobStore>,
    ExpenseClassifier,
    ClassifierFactory,
>;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    engine: InferenceEngine<ExpenseClassifier>,
    orchestrator: Arc<Orchestrator>,
}

impl AppServices {
    pub fn engine(&self) -> &InferenceEngine<ExpenseClassifier> {
        &self.engine
    }

    /// Populate the cache from the models bucket.
    pub async fn warm_up(&self) -> Result<usize, ExpcatError> {
        let loaded = self.orchestrator.reload().await?;
        tracing::info!(models = loaded, "model cache warmed");
        Ok(loaded)
    }

    /// Train on a detached task; the run completes even if the caller is dropped.
    pub async fn train(&self) -> Result<AccuracyReport, ExpcatError> {
        self.orchestrator
            .clone()
            .spawn_train_all()
            .await
            .map_err(|e| ExpcatError::transient(format!("training task failed: {e}")))?
    }

    /// Single prediction; runs inline (one small vector).
    pub fn predict(&self, tenant_id: &TenantId, description: Option<&str>) -> Result<Option<String>, ExpcatError> {
        self.engine.infer(tenant_id, description)
    }

    /// Bulk prediction on the blocking pool.
    pub async fn predict_bulk(
        &self,
        tenant_id: TenantId,
        descriptions: Vec<String>,
    ) -> Result<Vec<Option<String>>, ExpcatError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.bulk_infer(&tenant_id, &descriptions))
            .await
            .map_err(|e| ExpcatError::transient(format!("inference task failed: {e}")))?
    }
}

/// Wire stores, cache, orchestrator and engine from configuration.
///
/// `backups` holds the expense snapshots, `models` the trained artifacts.
pub fn build_services(config: &ExpcatConfig, backups: Arc<dyn BlobStore>, models: Arc<dyn BlobStore>) -> AppServices {
    let tokenizer = Arc::new(Tokenizer::default());
    let cache = Arc::new(ModelCache::default());

    let store = Arc::new(
        ModelStore::new(models)
            .with_naming(ArtifactNaming::new(config.artifact_aliases.clone()))
            .with_retry(config.store_retry.clone()),
    );
    let source: Arc<dyn TrainingDataSource> =
        Arc::new(BlobSnapshotSource::new(backups).with_retry(config.store_retry.clone()));

    let orchestrator = TrainingOrchestrator::new(
        source,
        store,
        cache.clone(),
        tokenizer.clone(),
        ExpenseClassifier::default as ClassifierFactory,
    )
    .with_params(config.training.clone());

    AppServices {
        engine: InferenceEngine::new(cache, tokenizer),
        orchestrator: Arc::new(orchestrator),
    }
}
