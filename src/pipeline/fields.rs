//! Append-only persistence of extraction results and review corrections.
//!
//! Extraction rows are never rewritten. A retried batch gets fresh
//! extraction ids and a fresh timestamp, so attempts stay distinguishable
//! and a partial failure can be retried as a whole without corrupting
//! earlier state.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::correction::generate_correction_id;
use crate::models::{CorrectionInput, ExtractedField, FieldCorrection, RawField};

/// Persist one extraction batch.
///
/// Each row gets a fresh extraction id; the whole batch shares one
/// timestamp and goes in as a single transaction. Any row failure fails
/// the batch, which the caller must treat as a full failure to retry.
pub fn write_fields(
    conn: &mut Connection,
    case_id: &str,
    document_id: &str,
    fields: &[RawField],
    processor_id: &str,
) -> Result<Vec<ExtractedField>, DatabaseError> {
    let extracted_at = Utc::now();

    let rows: Vec<ExtractedField> = fields
        .iter()
        .map(|field| ExtractedField {
            extraction_id: Uuid::new_v4(),
            case_id: case_id.to_string(),
            document_id: document_id.to_string(),
            field_name: field.field_name.clone(),
            value: field.value.clone(),
            confidence: field.confidence,
            page_number: field.page_number,
            bounding_box: field.bounding_box.clone(),
            processor_id: processor_id.to_string(),
            extracted_at,
            is_corrected: false,
        })
        .collect();

    repository::insert_extracted_fields(conn, &rows)?;

    tracing::info!(
        case_id,
        document_id,
        rows = rows.len(),
        processor_id,
        "Inserted extracted fields"
    );
    Ok(rows)
}

/// Persist human-submitted corrections under the same additive contract.
///
/// The referenced extraction rows are left untouched; a correction is a
/// new row, never a rewrite. Dangling extraction references are accepted.
pub fn write_corrections(
    conn: &mut Connection,
    case_id: &str,
    document_id: Option<&str>,
    corrections: &[CorrectionInput],
    reviewer_id: &str,
) -> Result<Vec<FieldCorrection>, DatabaseError> {
    let review_timestamp = Utc::now();

    let rows: Vec<FieldCorrection> = corrections
        .iter()
        .map(|c| FieldCorrection {
            correction_id: generate_correction_id(),
            extraction_id: c.extraction_id.clone(),
            case_id: case_id.to_string(),
            document_id: document_id.map(String::from),
            field_name: c.field_name.clone(),
            original_value: c.original_value.clone(),
            corrected_value: c.corrected_value.clone(),
            reviewer_id: reviewer_id.to_string(),
            review_timestamp,
            correction_reason: c.reason.clone(),
        })
        .collect();

    repository::insert_corrections(conn, &rows)?;

    tracing::info!(
        case_id,
        corrections = rows.len(),
        reviewer_id,
        "Inserted field corrections"
    );
    Ok(rows)
}
