//! LendingOps: loan-document ingestion and extraction pipeline.
//!
//! Documents uploaded against a loan case are stored, hashed for
//! per-case deduplication, and announced as events. A worker consumes
//! each event exactly-once-in-effect: extraction results are appended,
//! the batch's average confidence is compared against a threshold, and
//! the document and case statuses move accordingly. Low-confidence work
//! lands in a human review queue whose corrections are appended next to
//! the original values, never over them.

pub mod config;
pub mod db;
pub mod intake;
pub mod models;
pub mod pipeline;
pub mod review;

pub use config::Config;
pub use pipeline::{Disposition, IngestionWorker};
