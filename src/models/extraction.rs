use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One (field name, value, confidence) triple produced for one document by
/// one extraction call.
///
/// Rows are append-only: an `extraction_id` is unique per written row, not
/// per field name, so multiple extraction attempts for the same document
/// coexist. Corrections land in `field_corrections`, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub extraction_id: Uuid,
    pub case_id: String,
    pub document_id: String,
    pub field_name: String,
    pub value: String,
    pub confidence: f64,
    pub page_number: u32,
    /// JSON-encoded bounding polygon, when the processor reports geometry.
    pub bounding_box: Option<String>,
    pub processor_id: String,
    pub extracted_at: DateTime<Utc>,
    pub is_corrected: bool,
}

/// A field as returned by the extraction engine, before persistence
/// assigns ids and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    pub field_name: String,
    pub value: String,
    pub confidence: f64,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub bounding_box: Option<String>,
}

impl RawField {
    pub fn new(field_name: &str, value: &str, confidence: f64) -> Self {
        Self {
            field_name: field_name.to_string(),
            value: value.to_string(),
            confidence,
            page_number: 0,
            bounding_box: None,
        }
    }
}
