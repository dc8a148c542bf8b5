//! Object storage abstraction.
//!
//! Keys are `/`-separated relative paths (e.g. `expcat/expcat-<tenant>`).
//! Transfers go through local files so callers can stage payloads in scoped
//! temporary files.

pub mod fs;
pub mod in_memory;
pub mod r#trait;

pub use fs::FsBlobStore;
pub use in_memory::InMemoryBlobStore;
pub use r#trait::{BlobStore, BlobStoreError, validate_key};
