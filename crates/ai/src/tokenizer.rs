//! Description normalization.
//!
//! Pipeline per whitespace-separated piece:
//! 1. lowercase
//! 2. drop configured punctuation characters and numeric characters
//! 3. discard the piece if nothing is left (pure punctuation / pure digits)
//! 4. stem, discarding pieces that stem to the empty string
//!
//! The tokenizer holds no mutable state: tokenizing the same text twice
//! always yields the same tokens.

use std::collections::HashSet;
use std::sync::Arc;

use rust_stemmers::Algorithm;

/// ASCII punctuation, the default set stripped from every token.
pub const DEFAULT_PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Reduces a lowercase word to its stem.
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Snowball stemmer (English by default).
pub struct SnowballStemmer {
    inner: rust_stemmers::Stemmer,
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            inner: rust_stemmers::Stemmer::create(algorithm),
        }
    }

    pub fn english() -> Self {
        Self::new(Algorithm::English)
    }
}

impl core::fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnowballStemmer").finish_non_exhaustive()
    }
}

impl Stemmer for SnowballStemmer {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(word).into_owned()
    }
}

/// Leaves words untouched (useful in tests and for languages without a stemmer).
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem(&self, word: &str) -> String {
        word.to_string()
    }
}

#[derive(Clone)]
pub struct Tokenizer {
    punctuation: HashSet<char>,
    stemmer: Arc<dyn Stemmer>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_PUNCTUATION.chars(), Arc::new(SnowballStemmer::english()))
    }
}

impl core::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("punctuation", &self.punctuation.len())
            .finish_non_exhaustive()
    }
}

impl Tokenizer {
    pub fn new(punctuation: impl IntoIterator<Item = char>, stemmer: Arc<dyn Stemmer>) -> Self {
        Self {
            punctuation: punctuation.into_iter().collect(),
            stemmer,
        }
    }

    pub fn with_stemmer(mut self, stemmer: Arc<dyn Stemmer>) -> Self {
        self.stemmer = stemmer;
        self
    }

    pub fn with_punctuation(mut self, punctuation: impl IntoIterator<Item = char>) -> Self {
        self.punctuation = punctuation.into_iter().collect();
        self
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter_map(|piece| self.normalize(piece))
            .collect()
    }

    fn normalize(&self, piece: &str) -> Option<String> {
        let cleaned: String = piece
            .to_lowercase()
            .chars()
            .filter(|c| !self.punctuation.contains(c) && !c.is_numeric())
            .collect();

        if cleaned.is_empty() {
            return None;
        }

        let stemmed = self.stemmer.stem(&cleaned);
        if stemmed.is_empty() { None } else { Some(stemmed) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plain() -> Tokenizer {
        Tokenizer::default().with_stemmer(Arc::new(IdentityStemmer))
    }

    #[test]
    fn lowercases_and_strips_punctuation_and_digits() {
        let tokens = plain().tokenize("Pizza-Hut, DINNER 12 x2 ...");
        assert_eq!(tokens, vec!["pizzahut", "dinner", "x"]);
    }

    #[test]
    fn empty_or_letterless_input_yields_nothing() {
        assert!(plain().tokenize("").is_empty());
        assert!(plain().tokenize("   \t\n").is_empty());
        assert!(plain().tokenize("12 - 3.50 !!").is_empty());
    }

    #[test]
    fn stems_with_snowball() {
        let tokens = Tokenizer::default().tokenize("Train tickets booking");
        assert_eq!(tokens, vec!["train", "ticket", "book"]);
    }

    #[test]
    fn custom_punctuation_set_is_respected() {
        let t = plain().with_punctuation(['#']);
        assert_eq!(t.tokenize("a-b #c"), vec!["a-b", "c"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn tokenizing_twice_is_identical(text in "\\PC{0,64}") {
            let t = Tokenizer::default();
            prop_assert_eq!(t.tokenize(&text), t.tokenize(&text));
        }

        #[test]
        fn tokens_are_never_empty_and_have_no_digits(text in "[a-zA-Z0-9 .,!-]{0,64}") {
            for token in plain().tokenize(&text) {
                prop_assert!(!token.is_empty());
                prop_assert!(!token.chars().any(|c| c.is_ascii_digit()));
                prop_assert_eq!(token.to_lowercase(), token.clone());
            }
        }
    }
}
