//! Multi-class supervised learner contract and the default implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encoder::FeatureVector;
use crate::result::AiError;

/// Fit/predict contract for a per-tenant category model.
///
/// Implementations are bound to one vocabulary: `input_dim()` must equal the
/// vocabulary size the model was fitted with.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, features: &[FeatureVector], labels: &[String]) -> Result<(), AiError>;

    fn predict(&self, features: &FeatureVector) -> Result<String, AiError>;

    /// Input dimensionality (0 before `fit`).
    fn input_dim(&self) -> usize;

    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<String>, AiError> {
        features.iter().map(|f| self.predict(f)).collect()
    }
}

/// Fraction of `features` whose prediction equals the label.
///
/// An empty partition scores 0.0.
pub fn accuracy<C: Classifier + ?Sized>(
    classifier: &C,
    features: &[FeatureVector],
    labels: &[String],
) -> Result<f64, AiError> {
    if features.len() != labels.len() {
        return Err(AiError::InvalidInput(format!(
            "{} feature vectors but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if features.is_empty() {
        return Ok(0.0);
    }

    let mut correct = 0usize;
    for (f, label) in features.iter().zip(labels) {
        if classifier.predict(f)? == *label {
            correct += 1;
        }
    }
    Ok(correct as f64 / features.len() as f64)
}

/// Bernoulli naive Bayes over presence vectors, with Laplace smoothing.
///
/// Classes are kept sorted so ties resolve to the lexicographically smallest
/// category, which keeps predictions deterministic.
///
/// Deserialization checks the table shapes, so a loaded model can always
/// score any vector of length `dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBernoulliNaiveBayes")]
pub struct BernoulliNaiveBayes {
    alpha: f64,
    dim: usize,
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    /// log P(x_j = 1 | c) - log P(x_j = 0 | c), per class.
    log_odds: Vec<Vec<f64>>,
    /// sum_j log P(x_j = 0 | c), per class.
    log_absent_total: Vec<f64>,
}

#[derive(Deserialize)]
struct RawBernoulliNaiveBayes {
    alpha: f64,
    dim: usize,
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    log_odds: Vec<Vec<f64>>,
    log_absent_total: Vec<f64>,
}

impl TryFrom<RawBernoulliNaiveBayes> for BernoulliNaiveBayes {
    type Error = AiError;

    fn try_from(raw: RawBernoulliNaiveBayes) -> Result<Self, Self::Error> {
        let invalid = |msg: String| -> Result<Self, AiError> { Err(AiError::InvalidInput(msg)) };
        let n = raw.classes.len();

        if !(raw.alpha.is_finite() && raw.alpha > 0.0) {
            return invalid(format!("alpha must be finite and positive, got {}", raw.alpha));
        }
        if raw.class_log_prior.len() != n || raw.log_odds.len() != n || raw.log_absent_total.len() != n {
            return invalid(format!(
                "{n} classes but {} priors, {} odds rows and {} absence totals",
                raw.class_log_prior.len(),
                raw.log_odds.len(),
                raw.log_absent_total.len()
            ));
        }
        if n > 0 && raw.dim == 0 {
            return invalid("fitted model has zero input dimension".to_string());
        }
        if let Some((c, row)) = raw.log_odds.iter().enumerate().find(|(_, row)| row.len() != raw.dim) {
            return invalid(format!("odds row {c} has {} entries, expected {}", row.len(), raw.dim));
        }
        let all_finite = raw
            .class_log_prior
            .iter()
            .chain(&raw.log_absent_total)
            .chain(raw.log_odds.iter().flatten())
            .all(|v| v.is_finite());
        if !all_finite {
            return invalid("model tables contain non-finite values".to_string());
        }

        Ok(Self {
            alpha: raw.alpha,
            dim: raw.dim,
            classes: raw.classes,
            class_log_prior: raw.class_log_prior,
            log_odds: raw.log_odds,
            log_absent_total: raw.log_absent_total,
        })
    }
}

impl Default for BernoulliNaiveBayes {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl BernoulliNaiveBayes {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            dim: 0,
            classes: Vec::new(),
            class_log_prior: Vec::new(),
            log_odds: Vec::new(),
            log_absent_total: Vec::new(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }
}

impl Classifier for BernoulliNaiveBayes {
    fn fit(&mut self, features: &[FeatureVector], labels: &[String]) -> Result<(), AiError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(AiError::FitFailed(
                "alpha must be a finite positive number".to_string(),
            ));
        }
        if features.is_empty() {
            return Err(AiError::FitFailed("no training examples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(AiError::FitFailed(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let dim = features[0].len();
        if dim == 0 {
            return Err(AiError::FitFailed("feature vectors are empty".to_string()));
        }
        if let Some(bad) = features.iter().find(|f| f.len() != dim) {
            return Err(AiError::DimensionMismatch {
                expected: dim,
                found: bad.len(),
            });
        }

        // class -> (examples seen, per-feature presence counts)
        let mut counts: BTreeMap<&str, (usize, Vec<usize>)> = BTreeMap::new();
        for (f, label) in features.iter().zip(labels) {
            let entry = counts
                .entry(label.as_str())
                .or_insert_with(|| (0, vec![0; dim]));
            entry.0 += 1;
            for j in f.active_indices() {
                entry.1[j] += 1;
            }
        }

        let total = features.len() as f64;
        let mut classes = Vec::with_capacity(counts.len());
        let mut class_log_prior = Vec::with_capacity(counts.len());
        let mut log_odds = Vec::with_capacity(counts.len());
        let mut log_absent_total = Vec::with_capacity(counts.len());

        for (label, (n_c, presence)) in counts {
            let denom = n_c as f64 + 2.0 * self.alpha;
            let mut odds = Vec::with_capacity(dim);
            let mut absent = 0.0;
            for count in presence {
                let p = (count as f64 + self.alpha) / denom;
                let log_p = p.ln();
                let log_q = (1.0 - p).ln();
                odds.push(log_p - log_q);
                absent += log_q;
            }
            classes.push(label.to_string());
            class_log_prior.push((n_c as f64 / total).ln());
            log_odds.push(odds);
            log_absent_total.push(absent);
        }

        self.dim = dim;
        self.classes = classes;
        self.class_log_prior = class_log_prior;
        self.log_odds = log_odds;
        self.log_absent_total = log_absent_total;
        Ok(())
    }

    fn predict(&self, features: &FeatureVector) -> Result<String, AiError> {
        if !self.is_fitted() {
            return Err(AiError::NotFitted);
        }
        if features.len() != self.dim {
            return Err(AiError::DimensionMismatch {
                expected: self.dim,
                found: features.len(),
            });
        }

        let active: Vec<usize> = features.active_indices().collect();
        let mut best = 0usize;
        let mut best_score = f64::NEG_INFINITY;
        for c in 0..self.classes.len() {
            let score = self.class_log_prior[c]
                + self.log_absent_total[c]
                + active.iter().map(|&j| self.log_odds[c][j]).sum::<f64>();
            if score > best_score {
                best = c;
                best_score = score;
            }
        }
        Ok(self.classes[best].clone())
    }

    fn input_dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: &[f64]) -> FeatureVector {
        FeatureVector::from_values(values.to_vec())
    }

    fn labels(ls: &[&str]) -> Vec<String> {
        ls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn separable_data_is_learned() {
        // slots: [UNK, pizza, dinner, bus, ticket]
        let x = vec![
            fv(&[0.0, 1.0, 1.0, 0.0, 0.0]),
            fv(&[0.0, 0.0, 0.0, 1.0, 1.0]),
            fv(&[0.0, 1.0, 0.0, 0.0, 0.0]),
            fv(&[0.0, 0.0, 0.0, 0.0, 1.0]),
        ];
        let y = labels(&["food", "transport", "food", "transport"]);

        let mut nb = BernoulliNaiveBayes::default();
        nb.fit(&x, &y).unwrap();

        assert_eq!(nb.input_dim(), 5);
        assert_eq!(nb.classes(), &["food".to_string(), "transport".to_string()]);
        assert_eq!(nb.predict(&fv(&[0.0, 1.0, 0.0, 0.0, 0.0])).unwrap(), "food");
        assert_eq!(nb.predict(&fv(&[0.0, 0.0, 0.0, 1.0, 0.0])).unwrap(), "transport");
        assert_eq!(accuracy(&nb, &x, &y).unwrap(), 1.0);
    }

    #[test]
    fn rejects_unfitted_and_wrong_dimension() {
        let nb = BernoulliNaiveBayes::default();
        assert_eq!(nb.predict(&fv(&[1.0])), Err(AiError::NotFitted));

        let mut nb = BernoulliNaiveBayes::default();
        nb.fit(&[fv(&[0.0, 1.0])], &labels(&["a"])).unwrap();
        assert!(matches!(
            nb.predict(&fv(&[0.0, 1.0, 0.0])),
            Err(AiError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn fit_validates_input() {
        let mut nb = BernoulliNaiveBayes::default();
        assert!(nb.fit(&[], &[]).is_err());
        assert!(nb.fit(&[fv(&[1.0])], &labels(&["a", "b"])).is_err());
        assert!(matches!(
            nb.fit(&[fv(&[1.0, 0.0]), fv(&[1.0])], &labels(&["a", "b"])),
            Err(AiError::DimensionMismatch { .. })
        ));
        assert!(BernoulliNaiveBayes::new(0.0).fit(&[fv(&[1.0])], &labels(&["a"])).is_err());
    }

    #[test]
    fn serialized_model_predicts_identically() {
        let x = vec![fv(&[0.0, 1.0, 0.0]), fv(&[0.0, 0.0, 1.0])];
        let y = labels(&["food", "transport"]);
        let mut nb = BernoulliNaiveBayes::default();
        nb.fit(&x, &y).unwrap();

        let json = serde_json::to_vec(&nb).unwrap();
        let back: BernoulliNaiveBayes = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.predict_batch(&x).unwrap(), nb.predict_batch(&x).unwrap());
    }

    #[test]
    fn inconsistent_tables_are_rejected_on_load() {
        let bad = [
            r#"{"alpha":1.0,"dim":2,"classes":["food"],"class_log_prior":[],"log_odds":[],"log_absent_total":[]}"#,
            r#"{"alpha":1.0,"dim":2,"classes":["food"],"class_log_prior":[0.0],"log_odds":[[0.1]],"log_absent_total":[-1.0]}"#,
            r#"{"alpha":1.0,"dim":0,"classes":["food"],"class_log_prior":[0.0],"log_odds":[[]],"log_absent_total":[-1.0]}"#,
            r#"{"alpha":0.0,"dim":1,"classes":["food"],"class_log_prior":[0.0],"log_odds":[[0.1]],"log_absent_total":[-1.0]}"#,
            r#"{"alpha":1.0,"dim":1,"classes":["food"],"class_log_prior":[1e999],"log_odds":[[0.1]],"log_absent_total":[-1.0]}"#,
        ];
        for json in bad {
            assert!(serde_json::from_str::<BernoulliNaiveBayes>(json).is_err(), "{json}");
        }

        let ok = r#"{"alpha":1.0,"dim":1,"classes":["food"],"class_log_prior":[0.0],"log_odds":[[0.1]],"log_absent_total":[-1.0]}"#;
        let nb: BernoulliNaiveBayes = serde_json::from_str(ok).unwrap();
        assert_eq!(nb.predict(&fv(&[1.0])).unwrap(), "food");

        let unfitted = serde_json::to_string(&BernoulliNaiveBayes::default()).unwrap();
        assert!(serde_json::from_str::<BernoulliNaiveBayes>(&unfitted).is_ok());
    }

    #[test]
    fn accuracy_of_empty_partition_is_zero() {
        let mut nb = BernoulliNaiveBayes::default();
        nb.fit(&[fv(&[1.0])], &labels(&["a"])).unwrap();
        assert_eq!(accuracy(&nb, &[], &[]).unwrap(), 0.0);
    }
}
