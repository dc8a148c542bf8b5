//! Per-tenant word → index table.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::result::AiError;

/// Reserved out-of-vocabulary marker. Tokens are always lowercase, so the
/// uppercase marker can never collide with a real token.
pub const OOV_TOKEN: &str = "UNK";
pub const OOV_INDEX: usize = 0;

/// Immutable word → index mapping.
///
/// Index 0 is the OOV bucket; real tokens get `1..len` in first-seen order.
/// Persisted as a JSON object `{ "word": index, ..., "UNK": 0 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from a tokenized corpus, scanning sequences (and tokens) in order.
    ///
    /// Tokens must come from `Tokenizer`, which lowercases them. A literal
    /// `UNK` token would otherwise land in the OOV slot.
    pub fn build<I, S, T>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut words = vec![OOV_TOKEN.to_string()];
        let mut index = HashMap::new();
        index.insert(OOV_TOKEN.to_string(), OOV_INDEX);

        for sequence in sequences {
            for token in sequence {
                let token = token.as_ref();
                debug_assert_ne!(token, OOV_TOKEN, "OOV marker passed as a corpus token");
                if !index.contains_key(token) {
                    index.insert(token.to_string(), words.len());
                    words.push(token.to_string());
                }
            }
        }

        Self { words, index }
    }

    /// Index of `token`, or `OOV_INDEX` when absent.
    pub fn index_of(&self, token: &str) -> usize {
        self.index.get(token).copied().unwrap_or(OOV_INDEX)
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Size including the OOV slot (never zero).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of real tokens (excludes OOV).
    pub fn distinct_tokens(&self) -> usize {
        self.words.len() - 1
    }

    /// Words ordered by index; position 0 is the OOV marker.
    pub fn words(&self) -> &[String] {
        &self.words
    }
}

impl TryFrom<BTreeMap<String, usize>> for Vocabulary {
    type Error = AiError;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        if map.get(OOV_TOKEN) != Some(&OOV_INDEX) {
            return Err(AiError::InvalidInput(format!(
                "vocabulary must map {OOV_TOKEN} to {OOV_INDEX}"
            )));
        }

        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        for (word, &idx) in &map {
            let Some(slot) = slots.get_mut(idx) else {
                return Err(AiError::InvalidInput(format!(
                    "vocabulary index {idx} out of range for size {}",
                    map.len()
                )));
            };
            if let Some(other) = slot.as_ref() {
                return Err(AiError::InvalidInput(format!(
                    "vocabulary index {idx} assigned to both '{other}' and '{word}'"
                )));
            }
            *slot = Some(word.clone());
        }

        // Every slot is filled: n distinct in-range indices over n slots.
        let words: Vec<String> = slots.into_iter().flatten().collect();
        let index = map.into_iter().collect();
        Ok(Self { words, index })
    }
}

impl From<Vocabulary> for BTreeMap<String, usize> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.index.into_iter().collect()
    }
}
