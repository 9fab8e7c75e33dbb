//! Intake surface: case creation and document registration.
//!
//! Registration is where content-hash deduplication happens. A file whose
//! bytes already exist for the same case is reported back as a duplicate
//! and produces no new rows, no stored object, and no event.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{repository, DatabaseError};
use crate::models::enums::{AuditEventType, CaseStatus, DocumentStatus};
use crate::models::{
    case::{generate_case_id, required_documents},
    document::generate_document_id,
    AuditEvent, Case, Document, NewCase,
};
use crate::pipeline::storage::{extension_for_mime, ObjectStore, StorageError};
use crate::pipeline::IngestEvent;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Empty upload for case {0}")]
    EmptyUpload(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Result of a registration attempt.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// New document: row written, object stored, event ready to publish.
    Registered {
        document: Document,
        event: IngestEvent,
    },
    /// Same bytes already registered for this case.
    Duplicate { existing_document_id: String },
}

/// Create a new case and return it along with its required-document list.
pub fn create_case(
    conn: &Connection,
    input: &NewCase,
) -> Result<(Case, Vec<&'static str>), IntakeError> {
    let now = Utc::now();
    let case = Case {
        case_id: generate_case_id(now),
        member_id: input.member_id.clone(),
        loan_type: input.loan_type,
        loan_amount: input.loan_amount,
        status: CaseStatus::Submitted,
        created_at: now,
        updated_at: now,
    };
    repository::insert_case(conn, &case)?;

    let required = required_documents(input.loan_type);
    repository::insert_audit_event(
        conn,
        &AuditEvent::new(
            &case.case_id,
            AuditEventType::CaseCreated,
            None,
            &serde_json::json!({
                "member_id": case.member_id,
                "loan_type": case.loan_type.as_str(),
                "loan_amount": case.loan_amount,
                "required_documents": required,
            }),
        ),
    )?;

    tracing::info!(
        case_id = %case.case_id,
        loan_type = case.loan_type.as_str(),
        "Created case"
    );
    Ok((case, required))
}

/// Register an uploaded document against a case.
///
/// Stores the bytes, writes the document row in UPLOADED status, records
/// an audit entry, and returns the ingestion event for the caller to
/// publish. Duplicate content for the same case short-circuits before any
/// of that.
pub fn register_document(
    conn: &Connection,
    store: &dyn ObjectStore,
    case_id: &str,
    document_type: &str,
    mime_type: &str,
    content: &[u8],
) -> Result<RegisterOutcome, IntakeError> {
    if repository::get_case(conn, case_id)?.is_none() {
        return Err(IntakeError::CaseNotFound(case_id.to_string()));
    }
    if content.is_empty() {
        return Err(IntakeError::EmptyUpload(case_id.to_string()));
    }

    let content_hash = STANDARD.encode(Sha256::digest(content));
    if let Some(existing) = repository::get_document_by_case_hash(conn, case_id, &content_hash)? {
        tracing::info!(
            case_id = %case_id,
            existing_document_id = %existing.document_id,
            "Duplicate upload detected, skipping registration"
        );
        return Ok(RegisterOutcome::Duplicate {
            existing_document_id: existing.document_id,
        });
    }

    let document_id = generate_document_id();
    let object_name = format!("{document_id}.{}", extension_for_mime(mime_type));
    let storage_uri = store.put(case_id, &object_name, content)?;

    let document = Document {
        document_id: document_id.clone(),
        case_id: case_id.to_string(),
        document_type: document_type.to_string(),
        storage_uri: storage_uri.clone(),
        content_hash,
        size_bytes: content.len() as u64,
        mime_type: mime_type.to_string(),
        status: DocumentStatus::Uploaded,
        uploaded_at: Utc::now(),
    };
    repository::insert_document(conn, &document)?;

    repository::insert_audit_event(
        conn,
        &AuditEvent::new(
            case_id,
            AuditEventType::DocumentUploaded,
            None,
            &serde_json::json!({
                "document_id": document.document_id,
                "document_type": document.document_type,
                "size_bytes": document.size_bytes,
            }),
        ),
    )?;

    let event = IngestEvent {
        case_id: case_id.to_string(),
        document_id,
        gcs_uri: storage_uri,
        document_type: document_type.to_string(),
        timestamp: Some(document.uploaded_at.to_rfc3339()),
        correlation_id: Some(format!("req-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])),
    };

    tracing::info!(
        case_id = %case_id,
        document_id = %event.document_id,
        document_type = %document_type,
        "Registered document"
    );
    Ok(RegisterOutcome::Registered { document, event })
}
