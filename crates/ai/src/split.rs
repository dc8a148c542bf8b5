//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::result::AiError;

/// Index partition of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..len` with a seeded ChaCha8 RNG and cut off the test share.
///
/// The test partition gets `ceil(len * test_ratio)` indices, but the training
/// partition always keeps at least one index when `len > 0`. The same
/// `(len, test_ratio, seed)` always yields the same split.
pub fn train_test_split(len: usize, test_ratio: f64, seed: u64) -> Result<Split, AiError> {
    if !(test_ratio.is_finite() && test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(AiError::InvalidInput(format!(
            "test_ratio must be in (0, 1), got {test_ratio}"
        )));
    }

    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((len as f64) * test_ratio).ceil() as usize;
    let test_len = test_len.min(len.saturating_sub(1));
    let train = indices.split_off(test_len);

    tracing::debug!(train = train.len(), test = indices.len(), seed, "dataset split");

    Ok(Split {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn eighty_twenty_sizes() {
        let s = train_test_split(100, 0.2, 42).unwrap();
        assert_eq!(s.train.len(), 80);
        assert_eq!(s.test.len(), 20);
    }

    #[test]
    fn small_datasets_keep_a_training_example() {
        let s = train_test_split(3, 0.2, 42).unwrap();
        assert_eq!((s.train.len(), s.test.len()), (2, 1));

        let s = train_test_split(1, 0.2, 42).unwrap();
        assert_eq!((s.train.len(), s.test.len()), (1, 0));

        let s = train_test_split(0, 0.2, 42).unwrap();
        assert!(s.train.is_empty() && s.test.is_empty());
    }

    #[test]
    fn partitions_cover_every_index_once() {
        let s = train_test_split(37, 0.2, 7).unwrap();
        let all: HashSet<usize> = s.train.iter().chain(&s.test).copied().collect();
        assert_eq!(all.len(), 37);
        assert_eq!(s.train.len() + s.test.len(), 37);
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        assert!(train_test_split(10, 0.0, 1).is_err());
        assert!(train_test_split(10, 1.0, 1).is_err());
        assert!(train_test_split(10, f64::NAN, 1).is_err());
    }
}
