//! Career-orientation prediction core.
//!
//! Turns a completed survey into a `(domain, confidence)` recommendation:
//! - fixed question catalog and answer collection (`catalog`)
//! - one-hot encoding reconciled against the training schema (`encoder`)
//! - classifier loading and inference with a demo fallback (`model`)
//! - domain metadata and school matching (`domains`)
//! - local SQLite persistence (`store`) and remote-then-local submission
//!   (`submit`), mirrored over HTTP by the local service (`server`)

pub mod catalog;
pub mod config;
pub mod domains;
pub mod encoder;
pub mod model;
pub mod server;
pub mod store;
pub mod submit;

// Re-exports for convenience
pub use catalog::{AnswerSet, QuestionKind, QuestionSpec, QUESTION_CATALOG};
pub use config::AppConfig;
pub use domains::{resolve, resolve_with_schools, Resolution, SchoolDirectory};
pub use encoder::encode;
pub use model::{ModelAdapter, Prediction, PredictionSource};
pub use store::{SqliteStudentStore, StudentRecord, StudentStore};
pub use submit::{SubmissionCoordinator, SubmissionOutcome, SubmissionPath};
