use std::sync::Arc;

use expcat_core::{TenantAccuracy, TenantId, TrainingExample, TrainingRunId};

use crate::classifier::{Classifier, accuracy};
use crate::encoder::{FeatureVector, encode};
use crate::job::AiJob;
use crate::result::AiError;
use crate::split::{Split, train_test_split};
use crate::tokenizer::Tokenizer;
use crate::vocabulary::Vocabulary;

/// Knobs shared by every tenant in a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    /// Share of examples held out for the test partition.
    pub test_ratio: f64,
    /// Split seed; fixed so runs are reproducible.
    pub seed: u64,
    /// Tenants with fewer examples fail with `InsufficientExamples`.
    pub min_examples: usize,
    /// Upper bound on examples per tenant; the most recent ones are kept.
    /// Zero disables the cap, so configuration rejects it.
    pub max_examples: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            min_examples: 2,
            max_examples: 50_000,
        }
    }
}

/// Output of one tenant's training: the fitted pair plus its scores.
///
/// The classifier and vocabulary come from the same run and must be stored
/// and served together.
#[derive(Debug, Clone)]
pub struct TrainedModel<C> {
    pub tenant_id: TenantId,
    pub run_id: TrainingRunId,
    pub classifier: C,
    pub vocabulary: Vocabulary,
    pub accuracy: TenantAccuracy,
    pub train_size: usize,
    pub test_size: usize,
}

/// Tokenize → build vocabulary → encode → split → fit → evaluate, for one tenant.
pub struct TenantTrainingJob<C> {
    tenant_id: TenantId,
    run_id: TrainingRunId,
    examples: Vec<TrainingExample>,
    tokenizer: Arc<Tokenizer>,
    params: TrainingParams,
    classifier: C,
}

impl<C: Classifier + 'static> TenantTrainingJob<C> {
    /// `classifier` must be a fresh, unfitted instance.
    pub fn new(
        tenant_id: TenantId,
        run_id: TrainingRunId,
        examples: Vec<TrainingExample>,
        tokenizer: Arc<Tokenizer>,
        params: TrainingParams,
        classifier: C,
    ) -> Self {
        Self {
            tenant_id,
            run_id,
            examples,
            tokenizer,
            params,
            classifier,
        }
    }
}

impl<C: Classifier + 'static> AiJob for TenantTrainingJob<C> {
    type Output = TrainedModel<C>;

    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    fn run(self) -> Result<TrainedModel<C>, AiError> {
        let Self {
            tenant_id,
            run_id,
            mut examples,
            tokenizer,
            params,
            mut classifier,
        } = self;

        if let Some(foreign) = examples.iter().find(|e| e.tenant_id != tenant_id) {
            return Err(AiError::InvalidInput(format!(
                "example for tenant {} handed to job for tenant {tenant_id}",
                foreign.tenant_id
            )));
        }

        if examples.len() < params.min_examples.max(1) {
            return Err(AiError::InsufficientExamples {
                found: examples.len(),
                required: params.min_examples.max(1),
            });
        }

        if params.max_examples > 0 && examples.len() > params.max_examples {
            let dropped = examples.len() - params.max_examples;
            tracing::info!(tenant = %tenant_id, dropped, "capping tenant corpus");
            examples.drain(..dropped);
        }

        let tokens: Vec<Vec<String>> = examples
            .iter()
            .map(|e| tokenizer.tokenize(&e.description))
            .collect();
        let vocabulary = Vocabulary::build(&tokens);
        let features: Vec<FeatureVector> = tokens.iter().map(|t| encode(t, &vocabulary)).collect();
        let labels: Vec<String> = examples.into_iter().map(|e| e.category).collect();

        let split = train_test_split(features.len(), params.test_ratio, params.seed)?;
        let (train, test) = partition(features, labels, &split);
        let (train_x, train_y) = train;
        let (test_x, test_y) = test;

        classifier.fit(&train_x, &train_y)?;
        if classifier.input_dim() != vocabulary.len() {
            return Err(AiError::DimensionMismatch {
                expected: vocabulary.len(),
                found: classifier.input_dim(),
            });
        }

        let acc = TenantAccuracy {
            train_accuracy: accuracy(&classifier, &train_x, &train_y)?,
            test_accuracy: accuracy(&classifier, &test_x, &test_y)?,
        };

        tracing::debug!(
            tenant = %tenant_id,
            vocabulary = vocabulary.len(),
            train = train_x.len(),
            test = test_x.len(),
            train_accuracy = acc.train_accuracy,
            test_accuracy = acc.test_accuracy,
            "tenant model fitted"
        );

        Ok(TrainedModel {
            tenant_id,
            run_id,
            classifier,
            vocabulary,
            accuracy: acc,
            train_size: train_x.len(),
            test_size: test_x.len(),
        })
    }
}

type Partition = (Vec<FeatureVector>, Vec<String>);

/// Move every encoded example into its side of `split`; nothing is copied.
fn partition(features: Vec<FeatureVector>, labels: Vec<String>, split: &Split) -> (Partition, Partition) {
    let mut slots: Vec<Option<(FeatureVector, String)>> = features.into_iter().zip(labels).map(Some).collect();
    let train = take_slots(&mut slots, &split.train);
    let test = take_slots(&mut slots, &split.test);
    (train, test)
}

fn take_slots(slots: &mut [Option<(FeatureVector, String)>], idx: &[usize]) -> Partition {
    idx.iter().filter_map(|&i| slots.get_mut(i)?.take()).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BernoulliNaiveBayes;

    fn tenant(s: &str) -> TenantId {
        TenantId::new(s).unwrap()
    }

    fn examples(t: &str, rows: &[(&str, &str)]) -> Vec<TrainingExample> {
        rows.iter()
            .map(|(d, c)| TrainingExample::new(tenant(t), *d, *c))
            .collect()
    }

    fn job(
        t: &str,
        rows: Vec<TrainingExample>,
        params: TrainingParams,
    ) -> TenantTrainingJob<BernoulliNaiveBayes> {
        TenantTrainingJob::new(
            tenant(t),
            TrainingRunId::new(),
            rows,
            Arc::new(Tokenizer::default()),
            params,
            BernoulliNaiveBayes::default(),
        )
    }

    #[test]
    fn trains_and_binds_classifier_to_vocabulary() {
        let rows = examples(
            "t1",
            &[
                ("pizza dinner", "food"),
                ("bus ticket", "transport"),
                ("train ticket", "transport"),
            ],
        );
        let model = job("t1", rows, TrainingParams::default()).run().unwrap();

        // pizza, dinner, bus, ticket, train + UNK
        assert_eq!(model.vocabulary.len(), 6);
        assert_eq!(model.classifier.input_dim(), model.vocabulary.len());
        assert_eq!((model.train_size, model.test_size), (2, 1));
        assert!((0.0..=1.0).contains(&model.accuracy.train_accuracy));
        assert!((0.0..=1.0).contains(&model.accuracy.test_accuracy));
    }

    #[test]
    fn same_inputs_give_same_scores() {
        let rows = examples(
            "t1",
            &[
                ("coffee bar", "food"),
                ("espresso", "food"),
                ("taxi home", "transport"),
                ("metro card", "transport"),
                ("lunch", "food"),
            ],
        );
        let a = job("t1", rows.clone(), TrainingParams::default()).run().unwrap();
        let b = job("t1", rows, TrainingParams::default()).run().unwrap();
        assert_eq!(a.accuracy, b.accuracy);
        assert_eq!(a.classifier, b.classifier);
    }

    #[test]
    fn too_few_examples_fail() {
        let rows = examples("t1", &[("pizza", "food")]);
        let err = job("t1", rows, TrainingParams::default()).run().unwrap_err();
        assert_eq!(err, AiError::InsufficientExamples { found: 1, required: 2 });
    }

    #[test]
    fn foreign_examples_are_rejected() {
        let mut rows = examples("t1", &[("pizza", "food"), ("bus", "transport")]);
        rows.extend(examples("t2", &[("taxi", "transport")]));
        assert!(matches!(
            job("t1", rows, TrainingParams::default()).run(),
            Err(AiError::InvalidInput(_))
        ));
    }

    #[test]
    fn partitions_take_each_example_exactly_once() {
        let features: Vec<FeatureVector> = (0..5).map(|i| FeatureVector::from_values(vec![0.0, i as f64])).collect();
        let labels: Vec<String> = (0..5).map(|i| format!("c{i}")).collect();
        let split = Split {
            train: vec![4, 0, 2],
            test: vec![1, 3],
        };

        let ((train_x, train_y), (test_x, test_y)) = partition(features, labels, &split);
        assert_eq!(train_y, vec!["c4", "c0", "c2"]);
        assert_eq!(test_y, vec!["c1", "c3"]);
        assert_eq!(train_x.len() + test_x.len(), 5);
        assert!(!train_x[1].is_active(1));
        assert!(test_x[0].is_active(1));

        // An index listed twice is only handed out once.
        let split = Split {
            train: vec![0, 0],
            test: vec![1],
        };
        let features = vec![FeatureVector::zeros(1), FeatureVector::zeros(1)];
        let labels = vec!["a".to_string(), "b".to_string()];
        let ((train_x, _), (test_x, _)) = partition(features, labels, &split);
        assert_eq!((train_x.len(), test_x.len()), (1, 1));
    }

    #[test]
    fn corpus_is_capped_to_most_recent_examples() {
        let rows = examples(
            "t1",
            &[
                ("old stuff", "misc"),
                ("pizza", "food"),
                ("bus", "transport"),
                ("taxi", "transport"),
            ],
        );
        let params = TrainingParams {
            max_examples: 3,
            ..TrainingParams::default()
        };
        let model = job("t1", rows, params).run().unwrap();
        assert!(!model.vocabulary.contains("old"));
        assert_eq!(model.train_size + model.test_size, 3);
    }
}
