//! Shared, atomically swapped model cache.
//!
//! Readers take an `Arc<ModelRegistry>` snapshot and keep using it for the
//! whole request; writers build a complete new registry off to the side and
//! swap the pointer. A reader therefore sees either the old registry or the
//! new one, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use expcat_ai::{Classifier, Tokenizer, Vocabulary, encode};
use expcat_core::{ExpcatError, TenantId, TrainingRunId};

/// A tenant's classifier together with the vocabulary it was fitted on.
#[derive(Debug)]
pub struct LoadedModel<C> {
    tenant_id: TenantId,
    run_id: TrainingRunId,
    classifier: C,
    vocabulary: Vocabulary,
}

impl<C: Classifier> LoadedModel<C> {
    /// Fails with `Corrupt` when the classifier's input dimension is not the
    /// vocabulary size.
    pub fn new(
        tenant_id: TenantId,
        run_id: TrainingRunId,
        classifier: C,
        vocabulary: Vocabulary,
    ) -> Result<Self, ExpcatError> {
        if classifier.input_dim() != vocabulary.len() {
            return Err(ExpcatError::corrupt(format!(
                "tenant {tenant_id}: classifier expects {} features but vocabulary has {}",
                classifier.input_dim(),
                vocabulary.len()
            )));
        }
        Ok(Self {
            tenant_id,
            run_id,
            classifier,
            vocabulary,
        })
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn run_id(&self) -> TrainingRunId {
        self.run_id
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Tokenize, encode against this model's own vocabulary, and predict.
    pub fn categorize(&self, tokenizer: &Tokenizer, description: &str) -> Result<String, ExpcatError> {
        let tokens = tokenizer.tokenize(description);
        let features = encode(&tokens, &self.vocabulary);
        Ok(self.classifier.predict(&features)?)
    }
}

/// Immutable tenant → model map.
#[derive(Debug)]
pub struct ModelRegistry<C> {
    models: HashMap<TenantId, Arc<LoadedModel<C>>>,
    loaded_at: DateTime<Utc>,
}

impl<C> ModelRegistry<C> {
    pub fn new(models: HashMap<TenantId, Arc<LoadedModel<C>>>) -> Self {
        Self {
            models,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    pub fn get(&self, tenant_id: &TenantId) -> Option<Arc<LoadedModel<C>>> {
        self.models.get(tenant_id).cloned()
    }

    pub fn contains(&self, tenant_id: &TenantId) -> bool {
        self.models.contains_key(tenant_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self.models.keys().cloned().collect();
        tenants.sort();
        tenants
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[derive(Debug)]
pub struct ModelCache<C> {
    current: RwLock<Arc<ModelRegistry<C>>>,
}

impl<C> Default for ModelCache<C> {
    fn default() -> Self {
        Self::new(ModelRegistry::empty())
    }
}

impl<C> ModelCache<C> {
    pub fn new(registry: ModelRegistry<C>) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry in force right now.
    pub fn snapshot(&self) -> Arc<ModelRegistry<C>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a fully built registry, returning the previous one.
    pub fn replace(&self, registry: ModelRegistry<C>) -> Arc<ModelRegistry<C>> {
        let next = Arc::new(registry);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expcat_ai::{BernoulliNaiveBayes, FeatureVector};

    fn tenant(s: &str) -> TenantId {
        TenantId::new(s).unwrap()
    }

    fn fitted(vocab: &Vocabulary, label: &str) -> BernoulliNaiveBayes {
        let mut nb = BernoulliNaiveBayes::default();
        nb.fit(&[FeatureVector::zeros(vocab.len())], &[label.to_string()])
            .unwrap();
        nb
    }

    #[test]
    fn rejects_classifier_vocabulary_mismatch() {
        let small = Vocabulary::build([vec!["a"]]);
        let large = Vocabulary::build([vec!["a", "b"]]);
        let err = LoadedModel::new(tenant("t1"), TrainingRunId::new(), fitted(&small, "x"), large)
            .unwrap_err();
        assert!(matches!(err, ExpcatError::Corrupt(_)));
    }

    #[test]
    fn replace_swaps_whole_registry() {
        let vocab = Vocabulary::build([vec!["pizza"]]);
        let model = LoadedModel::new(tenant("t1"), TrainingRunId::new(), fitted(&vocab, "food"), vocab)
            .unwrap();

        let cache: ModelCache<BernoulliNaiveBayes> = ModelCache::default();
        let before = cache.snapshot();
        assert!(before.is_empty());

        let mut models = HashMap::new();
        models.insert(tenant("t1"), Arc::new(model));
        let previous = cache.replace(ModelRegistry::new(models));

        assert!(previous.is_empty());
        // A snapshot taken before the swap is unaffected.
        assert!(before.get(&tenant("t1")).is_none());
        let after = cache.snapshot();
        assert_eq!(after.tenants(), vec![tenant("t1")]);
        let m = after.get(&tenant("t1")).unwrap();
        assert_eq!(m.categorize(&Tokenizer::default(), "pizza").unwrap(), "food");
    }
}
