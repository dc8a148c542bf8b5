//! Infrastructure layer: object storage, artifact persistence, the shared
//! model cache, and the training/inference services built on them.

pub mod blob_store;
pub mod config;
pub mod inference;
pub mod model_cache;
pub mod model_store;
pub mod retry;
pub mod snapshot;
pub mod training;


pub use config::ExpcatConfig;
pub use inference::InferenceEngine;
pub use model_cache::{LoadedModel, ModelCache, ModelRegistry};
pub use model_store::{ArtifactNaming, LoadTiming, ModelStore};
pub use snapshot::{BlobSnapshotSource, TrainingDataSource};
pub use training::TrainingOrchestrator;
