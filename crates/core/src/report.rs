//! Training accuracy report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{TenantId, TrainingRunId};

pub const MODEL_NAME: &str = "expcat";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TenantAccuracy {
    #[serde(rename = "training_accuracy")]
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// Outcome of training one tenant: accuracies, or the error that stopped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantOutcome {
    Trained(TenantAccuracy),
    Failed { error: String },
}

impl TenantOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TenantOutcome::Trained(_))
    }

    pub fn accuracy(&self) -> Option<TenantAccuracy> {
        match self {
            TenantOutcome::Trained(a) => Some(*a),
            TenantOutcome::Failed { .. } => None,
        }
    }
}

/// Result of a full training run, one entry per tenant found in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub model: String,
    pub run_id: TrainingRunId,
    pub trained_at: DateTime<Utc>,
    pub accuracy: BTreeMap<TenantId, TenantOutcome>,
}

impl AccuracyReport {
    pub fn new(run_id: TrainingRunId) -> Self {
        Self {
            model: MODEL_NAME.to_string(),
            run_id,
            trained_at: Utc::now(),
            accuracy: BTreeMap::new(),
        }
    }

    pub fn record_trained(&mut self, tenant_id: TenantId, accuracy: TenantAccuracy) {
        self.accuracy.insert(tenant_id, TenantOutcome::Trained(accuracy));
    }

    pub fn record_failure(&mut self, tenant_id: TenantId, error: impl Into<String>) {
        self.accuracy.insert(
            tenant_id,
            TenantOutcome::Failed {
                error: error.into(),
            },
        );
    }

    pub fn get(&self, tenant_id: &TenantId) -> Option<&TenantOutcome> {
        self.accuracy.get(tenant_id)
    }

    pub fn trained_count(&self) -> usize {
        self.accuracy.values().filter(|o| o.is_trained()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.accuracy.len() - self.trained_count()
    }
}
