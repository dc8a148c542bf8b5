//! `expcat-ai`
//!
//! **Responsibility:** the text-to-feature pipeline and the per-tenant learner.
//!
//! Everything here is synchronous and free of I/O:
//! - `tokenizer` normalizes descriptions into stemmed tokens.
//! - `vocabulary` + `encoder` turn tokens into presence vectors.
//! - `classifier` defines the fit/predict contract and ships a Bernoulli naive Bayes.
//! - `training` runs the whole pipeline for one tenant and scores it.
//!
//! Storage, caching and scheduling live in `expcat-infra`.

pub mod classifier;
pub mod encoder;
pub mod job;
pub mod result;
pub mod split;
pub mod tokenizer;
pub mod training;
pub mod vocabulary;

pub use classifier::{BernoulliNaiveBayes, Classifier, accuracy};
pub use encoder::{FeatureVector, encode};
pub use job::AiJob;
pub use result::AiError;
pub use split::{Split, train_test_split};
pub use tokenizer::{DEFAULT_PUNCTUATION, IdentityStemmer, SnowballStemmer, Stemmer, Tokenizer};
pub use training::{TenantTrainingJob, TrainedModel, TrainingParams};
pub use vocabulary::{OOV_INDEX, OOV_TOKEN, Vocabulary};
