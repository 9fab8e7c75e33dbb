//! Human review completion.
//!
//! A reviewer submits zero or more field corrections for a case; the
//! corrections are appended without touching the original extraction rows,
//! the case advances to READY_FOR_DECISION, and the action is audited.

use rusqlite::Connection;
use thiserror::Error;

use crate::db::{repository, DatabaseError};
use crate::models::enums::{AuditEventType, CaseStatus};
use crate::models::{AuditEvent, CorrectionInput};
use crate::pipeline::fields::write_corrections;
use crate::pipeline::reconcile::apply_review_completion;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Reviewer id must not be empty")]
    MissingReviewer,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A reviewer's submission for one case.
#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub case_id: String,
    pub reviewer_id: String,
    pub document_id: Option<String>,
    pub corrections: Vec<CorrectionInput>,
}

/// Outcome of a completed review.
#[derive(Debug)]
pub struct ReviewResult {
    pub case_id: String,
    pub new_status: CaseStatus,
    pub corrections_applied: usize,
}

/// Record a reviewer's corrections and advance the case.
///
/// The status transition is unconditional: reviewing a case that needed no
/// corrections still moves it to READY_FOR_DECISION. Corrections are
/// append-only; the extracted rows they override are left as written.
pub fn complete_review(
    conn: &mut Connection,
    submission: &ReviewSubmission,
) -> Result<ReviewResult, ReviewError> {
    if submission.reviewer_id.trim().is_empty() {
        return Err(ReviewError::MissingReviewer);
    }
    if repository::get_case(conn, &submission.case_id)?.is_none() {
        return Err(ReviewError::CaseNotFound(submission.case_id.clone()));
    }

    let written = write_corrections(
        conn,
        &submission.case_id,
        submission.document_id.as_deref(),
        &submission.corrections,
        &submission.reviewer_id,
    )?;

    let new_status = apply_review_completion(conn, &submission.case_id)?;

    repository::insert_audit_event(
        conn,
        &AuditEvent::new(
            &submission.case_id,
            AuditEventType::ReviewCompleted,
            Some(&submission.reviewer_id),
            &serde_json::json!({
                "corrections_applied": written.len(),
                "new_status": new_status.as_str(),
            }),
        ),
    )?;

    tracing::info!(
        case_id = %submission.case_id,
        reviewer_id = %submission.reviewer_id,
        corrections = written.len(),
        "Review completed"
    );

    Ok(ReviewResult {
        case_id: submission.case_id.clone(),
        new_status,
        corrections_applied: written.len(),
    })
}
