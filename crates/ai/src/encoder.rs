//! Presence (binary bag-of-words) encoding.

use crate::vocabulary::Vocabulary;

/// Presence vector over a vocabulary of `len` slots; slot 0 aggregates unknown words.
///
/// Only the active slots are stored, so a vector costs memory proportional to
/// the distinct tokens of its description, not to the vocabulary size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureVector {
    len: usize,
    active: Vec<usize>,
}

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            active: Vec::new(),
        }
    }

    /// Dense constructor; any slot greater than zero counts as present.
    pub fn from_values(values: Vec<f64>) -> Self {
        let active = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| (*v > 0.0).then_some(i))
            .collect();
        Self {
            len: values.len(),
            active,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of present slots.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, idx: usize) -> bool {
        self.active.binary_search(&idx).is_ok()
    }

    /// Indices of present slots, ascending.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.iter().copied()
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.len];
        for &i in &self.active {
            dense[i] = 1.0;
        }
        dense
    }
}

/// Encode `tokens` against `vocabulary`.
///
/// Each known token marks its own slot, every unknown token marks the OOV
/// slot. Repeated tokens still yield 1.0 (presence, not counts).
pub fn encode<T: AsRef<str>>(tokens: &[T], vocabulary: &Vocabulary) -> FeatureVector {
    let mut active: Vec<usize> = tokens
        .iter()
        .map(|t| vocabulary.index_of(t.as_ref()))
        .collect();
    active.sort_unstable();
    active.dedup();
    FeatureVector {
        len: vocabulary.len(),
        active,
    }
}
