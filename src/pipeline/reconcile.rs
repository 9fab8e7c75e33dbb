//! Status reconciliation from extraction confidence and review outcomes.
//!
//! The transition computation is a pure function of the batch's average
//! confidence and the configured threshold; persisting the result is a
//! separate, retryable step. A crash between the two leaves nothing worse
//! than "attempt again".

use rusqlite::Connection;
use thiserror::Error;

use crate::db::{repository, DatabaseError};
use crate::models::enums::{CaseStatus, DocumentStatus};

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The computed case status contradicts an already-terminal stored
    /// status. Stale extraction events arriving after a decision must not
    /// silently overwrite it; this is surfaced, not fatal.
    #[error("Case {case_id} is already {current:?}; refusing to apply {attempted:?}")]
    Inconsistent {
        case_id: String,
        current: CaseStatus,
        attempted: CaseStatus,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Arithmetic mean of the batch confidences. An empty batch is 0.0:
/// absence of data is never treated as success.
pub fn average_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    confidences.iter().sum::<f64>() / confidences.len() as f64
}

/// Compute the post-extraction document and case statuses.
///
/// The same threshold rule applies at both granularities. Case status is
/// set from this event's own average, not an aggregate over all of the
/// case's documents, so a later low-confidence document can move a case
/// back into NEEDS_REVIEW after it was marked ready. That is the intended,
/// observable policy.
pub fn reconcile_after_extraction(
    avg_confidence: f64,
    threshold: f64,
) -> (DocumentStatus, CaseStatus) {
    if avg_confidence < threshold {
        (DocumentStatus::NeedsReview, CaseStatus::NeedsReview)
    } else {
        (DocumentStatus::Extracted, CaseStatus::ReadyForReview)
    }
}

/// Persist the computed statuses for one extraction event.
///
/// The document status is always written. The case status is guarded:
/// if the stored case status is terminal, the update is refused and the
/// inconsistency surfaced to the caller.
pub fn apply_extraction_statuses(
    conn: &Connection,
    case_id: &str,
    document_id: &str,
    avg_confidence: f64,
    threshold: f64,
) -> Result<(DocumentStatus, CaseStatus), ReconcileError> {
    let (doc_status, case_status) = reconcile_after_extraction(avg_confidence, threshold);

    repository::update_document_status(conn, document_id, doc_status)?;

    let current = repository::get_case_status(conn, case_id)?;
    if current.is_terminal() {
        return Err(ReconcileError::Inconsistent {
            case_id: case_id.to_string(),
            current,
            attempted: case_status,
        });
    }

    repository::update_case_status(conn, case_id, case_status)?;

    tracing::info!(
        case_id,
        document_id,
        avg_confidence = format!("{avg_confidence:.2}"),
        document_status = doc_status.as_str(),
        case_status = case_status.as_str(),
        "Reconciled statuses after extraction"
    );
    Ok((doc_status, case_status))
}

/// Review completion moves the case to READY_FOR_DECISION unconditionally
/// once corrections are recorded, regardless of correction content.
pub fn apply_review_completion(
    conn: &Connection,
    case_id: &str,
) -> Result<CaseStatus, DatabaseError> {
    repository::update_case_status(conn, case_id, CaseStatus::ReadyForDecision)?;
    Ok(CaseStatus::ReadyForDecision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_case_status, insert_case, insert_document, update_case_status};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::LoanType;
    use crate::models::{Case, Document};
    use chrono::Utc;

    const THRESHOLD: f64 = 0.85;

    fn seed(conn: &Connection, case_id: &str, document_id: &str) {
        insert_case(
            conn,
            &Case {
                case_id: case_id.into(),
                member_id: "M-1".into(),
                loan_type: LoanType::Auto,
                loan_amount: 25_000.0,
                status: CaseStatus::Extracting,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .unwrap();
        insert_document(
            conn,
            &Document {
                document_id: document_id.into(),
                case_id: case_id.into(),
                document_type: "paystub".into(),
                storage_uri: "mock://case/doc.pdf".into(),
                content_hash: document_id.into(),
                size_bytes: 10,
                mime_type: "application/pdf".into(),
                status: DocumentStatus::Extracting,
                uploaded_at: Utc::now(),
            },
        )
        .unwrap();
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let confidences = [0.96, 0.94, 0.78, 0.92, 0.93, 0.97, 0.95, 0.89];
        let avg = average_confidence(&confidences);
        assert!((avg - 0.9175).abs() < 1e-9);
    }

    #[test]
    fn empty_batch_averages_to_zero() {
        assert_eq!(average_confidence(&[]), 0.0);
    }

    #[test]
    fn empty_batch_forces_needs_review() {
        let (doc, case) = reconcile_after_extraction(average_confidence(&[]), THRESHOLD);
        assert_eq!(doc, DocumentStatus::NeedsReview);
        assert_eq!(case, CaseStatus::NeedsReview);
    }

    #[test]
    fn high_confidence_is_extracted_and_ready() {
        let (doc, case) = reconcile_after_extraction(0.9175, THRESHOLD);
        assert_eq!(doc, DocumentStatus::Extracted);
        assert_eq!(case, CaseStatus::ReadyForReview);
    }

    #[test]
    fn low_confidence_needs_review() {
        let (doc, case) = reconcile_after_extraction(0.55, THRESHOLD);
        assert_eq!(doc, DocumentStatus::NeedsReview);
        assert_eq!(case, CaseStatus::NeedsReview);
    }

    #[test]
    fn threshold_boundary_is_not_review() {
        // Exactly at the threshold clears it: the rule is strictly-below.
        let (doc, case) = reconcile_after_extraction(THRESHOLD, THRESHOLD);
        assert_eq!(doc, DocumentStatus::Extracted);
        assert_eq!(case, CaseStatus::ReadyForReview);
    }

    #[test]
    fn apply_writes_both_statuses() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "CU-2024-00042", "doc-abc123");

        let (doc, case) =
            apply_extraction_statuses(&conn, "CU-2024-00042", "doc-abc123", 0.9175, THRESHOLD)
                .unwrap();
        assert_eq!(doc, DocumentStatus::Extracted);
        assert_eq!(case, CaseStatus::ReadyForReview);
        assert_eq!(
            get_case_status(&conn, "CU-2024-00042").unwrap(),
            CaseStatus::ReadyForReview
        );
    }

    #[test]
    fn later_low_confidence_event_moves_case_backward() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "CU-2024-00050", "doc-one");
        seed_document_only(&conn, "CU-2024-00050", "doc-two");

        apply_extraction_statuses(&conn, "CU-2024-00050", "doc-one", 0.95, THRESHOLD).unwrap();
        assert_eq!(
            get_case_status(&conn, "CU-2024-00050").unwrap(),
            CaseStatus::ReadyForReview
        );

        // Per-event policy: the second document's low average pulls the
        // case back into review.
        apply_extraction_statuses(&conn, "CU-2024-00050", "doc-two", 0.55, THRESHOLD).unwrap();
        assert_eq!(
            get_case_status(&conn, "CU-2024-00050").unwrap(),
            CaseStatus::NeedsReview
        );
    }

    fn seed_document_only(conn: &Connection, case_id: &str, document_id: &str) {
        insert_document(
            conn,
            &Document {
                document_id: document_id.into(),
                case_id: case_id.into(),
                document_type: "bank_statement_30days".into(),
                storage_uri: "mock://case/doc2.pdf".into(),
                content_hash: document_id.into(),
                size_bytes: 10,
                mime_type: "application/pdf".into(),
                status: DocumentStatus::Extracting,
                uploaded_at: Utc::now(),
            },
        )
        .unwrap();
    }

    #[test]
    fn terminal_case_refuses_extraction_update() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "CU-2024-00060", "doc-late");
        update_case_status(&conn, "CU-2024-00060", CaseStatus::Approved).unwrap();

        let err =
            apply_extraction_statuses(&conn, "CU-2024-00060", "doc-late", 0.95, THRESHOLD)
                .unwrap_err();
        assert!(matches!(err, ReconcileError::Inconsistent { .. }));
        // The stored terminal status is untouched.
        assert_eq!(
            get_case_status(&conn, "CU-2024-00060").unwrap(),
            CaseStatus::Approved
        );
    }

    #[test]
    fn review_completion_is_unconditional() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "CU-2024-00070", "doc-rev");
        update_case_status(&conn, "CU-2024-00070", CaseStatus::NeedsReview).unwrap();

        let status = apply_review_completion(&conn, "CU-2024-00070").unwrap();
        assert_eq!(status, CaseStatus::ReadyForDecision);
    }
}
