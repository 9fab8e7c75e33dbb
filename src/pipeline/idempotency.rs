//! Duplicate-work guard for redelivered events.
//!
//! A (case, document) pair that already has extraction rows was processed
//! before; the worker can acknowledge the redelivery without side effects.

use rusqlite::Connection;

use crate::db::repository;

/// Whether extraction results already exist for this (case, document) pair.
///
/// On a query failure this returns `false` and lets processing proceed:
/// a false negative costs one duplicate extraction attempt, which the
/// append-only field writer tolerates, while a false positive would
/// silently drop real work. Availability wins over strict suppression.
pub fn already_processed(conn: &Connection, case_id: &str, document_id: &str) -> bool {
    match repository::count_extracted_fields(conn, case_id, document_id) {
        Ok(count) => count > 0,
        Err(e) => {
            tracing::warn!(
                case_id,
                document_id,
                error = %e,
                "Idempotency check failed, proceeding with extraction"
            );
            false
        }
    }
}
