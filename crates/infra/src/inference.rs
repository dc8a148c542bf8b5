//! Read path: category prediction against the shared model cache.

use std::sync::Arc;

use tracing::debug;

use expcat_ai::{Classifier, Tokenizer};
use expcat_core::{ExpcatError, TenantId};

use crate::model_cache::{LoadedModel, ModelCache};

pub struct InferenceEngine<C> {
    cache: Arc<ModelCache<C>>,
    tokenizer: Arc<Tokenizer>,
}

impl<C> Clone for InferenceEngine<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            tokenizer: self.tokenizer.clone(),
        }
    }
}

impl<C: Classifier> InferenceEngine<C> {
    pub fn new(cache: Arc<ModelCache<C>>, tokenizer: Arc<Tokenizer>) -> Self {
        Self { cache, tokenizer }
    }

    pub fn cache(&self) -> &Arc<ModelCache<C>> {
        &self.cache
    }

    /// Predict the category of one description.
    ///
    /// An unknown tenant is `NotFound` even when the description is empty.
    /// A missing or blank description yields `None`.
    pub fn infer(&self, tenant_id: &TenantId, description: Option<&str>) -> Result<Option<String>, ExpcatError> {
        let model = self.model_for(tenant_id)?;
        match description {
            Some(d) if !d.trim().is_empty() => Ok(Some(model.categorize(&self.tokenizer, d)?)),
            _ => Ok(None),
        }
    }

    /// Predict categories for many descriptions, in input order.
    ///
    /// Every description is scored by the same model, even if the cache is
    /// swapped part way through.
    pub fn bulk_infer<S: AsRef<str>>(
        &self,
        tenant_id: &TenantId,
        descriptions: &[S],
    ) -> Result<Vec<Option<String>>, ExpcatError> {
        let model = self.model_for(tenant_id)?;
        let categories = descriptions
            .iter()
            .map(|d| {
                let d = d.as_ref();
                if d.trim().is_empty() {
                    Ok(None)
                } else {
                    model.categorize(&self.tokenizer, d).map(Some)
                }
            })
            .collect::<Result<Vec<_>, ExpcatError>>()?;
        debug!(tenant = %tenant_id, count = categories.len(), "bulk inference");
        Ok(categories)
    }

    fn model_for(&self, tenant_id: &TenantId) -> Result<Arc<LoadedModel<C>>, ExpcatError> {
        self.cache
            .snapshot()
            .get(tenant_id)
            .ok_or_else(|| ExpcatError::not_found(format!("no model for tenant {tenant_id}")))
    }
}
