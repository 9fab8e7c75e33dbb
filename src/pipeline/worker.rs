//! Ingestion worker: drives one event through the full pipeline and turns
//! the outcome into an explicit acknowledge/retry/dead-letter decision.
//!
//! Every step before acknowledgement is idempotent or additive, so a
//! failure anywhere retries the whole event rather than replaying a part
//! of it. Nothing thrown past this module can crash the worker process.

use rusqlite::Connection;

use crate::config::Config;
use crate::db::repository;
use crate::models::enums::DocumentStatus;
use crate::pipeline::event::{EventError, IngestEvent};
use crate::pipeline::gateway::{ExtractionEngine, ExtractionRequest};
use crate::pipeline::idempotency::already_processed;
use crate::pipeline::queue::EventSource;
use crate::pipeline::reconcile::{
    apply_extraction_statuses, average_confidence, ReconcileError,
};
use crate::pipeline::storage::ObjectStore;
use crate::pipeline::{fields, PipelineError};

/// What the worker tells the event source to do with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processing completed (or was already complete); consume the message.
    Ack,
    /// Transient failure; negative-acknowledge so the source redelivers
    /// under its own backoff policy.
    Retry,
    /// Permanently unprocessable; redelivery cannot fix it.
    DeadLetter,
}

/// Processes ingestion events start-to-finish, one at a time.
///
/// Each worker owns its own database connection; concurrent workers
/// coordinate through the store's consistency guarantees, not in-process
/// locks.
pub struct IngestionWorker {
    config: Config,
    conn: Connection,
    engine: Box<dyn ExtractionEngine>,
    store: Box<dyn ObjectStore>,
}

impl IngestionWorker {
    pub fn new(
        config: Config,
        conn: Connection,
        engine: Box<dyn ExtractionEngine>,
        store: Box<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            conn,
            engine,
            store,
        }
    }

    /// Process one raw event payload into a disposition.
    pub fn process(&mut self, payload: &[u8]) -> Disposition {
        let event = match IngestEvent::parse(payload) {
            Ok(event) => event,
            Err(EventError::Malformed(reason)) => {
                tracing::error!(reason, "Dropping malformed event to dead-letter");
                return Disposition::DeadLetter;
            }
        };

        match self.run_pipeline(&event) {
            Ok(()) => Disposition::Ack,
            Err(PipelineError::Reconcile(ReconcileError::Inconsistent {
                case_id,
                current,
                attempted,
            })) => {
                // A stale event for a decided case: surface it, leave the
                // terminal status alone, and consume the message.
                tracing::warn!(
                    case_id = %case_id,
                    current = current.as_str(),
                    attempted = attempted.as_str(),
                    document_id = %event.document_id,
                    "Late extraction event for terminal case; acknowledging without status change"
                );
                Disposition::Ack
            }
            Err(e) => {
                tracing::error!(
                    case_id = %event.case_id,
                    document_id = %event.document_id,
                    correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Event processing failed, negative-acknowledging for retry"
                );
                Disposition::Retry
            }
        }
    }

    fn run_pipeline(&mut self, event: &IngestEvent) -> Result<(), PipelineError> {
        tracing::info!(
            case_id = %event.case_id,
            document_id = %event.document_id,
            document_type = %event.document_type,
            correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
            "Processing ingestion event"
        );

        // Redelivery of an already-processed document is a no-op.
        if already_processed(&self.conn, &event.case_id, &event.document_id) {
            tracing::info!(
                document_id = %event.document_id,
                "Document already processed, skipping"
            );
            return Ok(());
        }

        repository::update_document_status(
            &self.conn,
            &event.document_id,
            DocumentStatus::Extracting,
        )?;

        let content = self.fetch_content(event)?;

        let processor_id = self.config.processor_for(&event.document_type).to_string();
        let extracted = self.engine.extract(&ExtractionRequest {
            content: &content,
            mime_type: "application/pdf",
            processor_id: &processor_id,
            document_type: &event.document_type,
        })?;

        fields::write_fields(
            &mut self.conn,
            &event.case_id,
            &event.document_id,
            &extracted,
            &processor_id,
        )?;

        let confidences: Vec<f64> = extracted.iter().map(|f| f.confidence).collect();
        let avg = average_confidence(&confidences);

        apply_extraction_statuses(
            &self.conn,
            &event.case_id,
            &event.document_id,
            avg,
            self.config.confidence_threshold,
        )?;

        tracing::info!(
            case_id = %event.case_id,
            document_id = %event.document_id,
            fields = extracted.len(),
            avg_confidence = format!("{avg:.4}"),
            "Successfully processed document"
        );
        Ok(())
    }

    /// Resolve the event's storage locator to bytes. Mock mode skips the
    /// external fetch but keeps the rest of the pipeline identical.
    fn fetch_content(&self, event: &IngestEvent) -> Result<Vec<u8>, PipelineError> {
        if self.config.mock_mode {
            tracing::info!(uri = %event.gcs_uri, "[MOCK] skipping object fetch");
            return Ok(Vec::new());
        }
        Ok(self.store.fetch(&event.gcs_uri)?)
    }

    /// Pull-process-acknowledge loop until shutdown is signalled.
    ///
    /// Polling granularity only affects idle latency; a busy queue is
    /// drained back-to-back.
    pub async fn run<S: EventSource>(&mut self, source: &S) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(250));

        tracing::info!(
            mock_mode = self.config.mock_mode,
            confidence_threshold = self.config.confidence_threshold,
            "Ingestion worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Processing is blocking I/O (SQLite, HTTP); keep it off
                    // the async executor proper.
                    tokio::task::block_in_place(|| {
                        while let Some(delivery) = source.pull() {
                            self.dispatch(source, delivery);
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping worker");
                    break;
                }
            }
        }
    }

    /// Process every message currently in the source, then return.
    /// Useful for tests and batch-style local runs.
    pub fn drain<S: EventSource>(&mut self, source: &S) -> usize {
        let mut processed = 0;
        while let Some(delivery) = source.pull() {
            self.dispatch(source, delivery);
            processed += 1;
        }
        processed
    }

    fn dispatch<S: EventSource>(&mut self, source: &S, delivery: crate::pipeline::queue::Delivery) {
        match self.process(&delivery.payload) {
            Disposition::Ack => source.ack(delivery.delivery_id),
            Disposition::Retry => source.nack(delivery.delivery_id),
            Disposition::DeadLetter => {
                // The source consumes the message; the payload is logged
                // above for the dead-letter trail.
                source.ack(delivery.delivery_id);
            }
        }
    }
}
