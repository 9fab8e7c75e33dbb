//! Document ingestion pipeline: event parsing, idempotency, object
//! retrieval, field extraction, persistence, and status reconciliation,
//! tied together by the worker loop.

pub mod event;
pub mod fields;
pub mod gateway;
pub mod idempotency;
pub mod queue;
pub mod reconcile;
pub mod storage;
pub mod worker;

pub use event::{EventError, IngestEvent};
pub use gateway::{build_engine, ExtractionEngine, ExtractionError, ExtractionRequest};
pub use queue::{Delivery, EventSource, InMemoryQueue};
pub use reconcile::ReconcileError;
pub use storage::{FsObjectStore, MockObjectStore, ObjectStore, StorageError};
pub use worker::{Disposition, IngestionWorker};

use crate::db::DatabaseError;

/// Any failure that can interrupt event processing. The worker maps each
/// variant to a queue disposition; callers outside the worker mostly see
/// this through logs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
