//! `expcat-core`: shared building blocks for the expense categorizer.
//!
//! This crate contains **pure** types (no I/O): tenant identifiers, the
//! error taxonomy surfaced to callers, training records and accuracy reports.

pub mod error;
pub mod example;
pub mod id;
pub mod report;

pub use error::{ExpcatError, ExpcatResult};
pub use example::{ExpenseRecord, TrainingExample};
pub use id::{TenantId, TrainingRunId};
pub use report::{AccuracyReport, MODEL_NAME, TenantAccuracy, TenantOutcome};
