use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A human override of one extracted field.
///
/// References the original extraction softly: the extraction write and the
/// correction write are not transactional together, so a dangling
/// `extraction_id` is tolerated as a data-quality issue rather than a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCorrection {
    pub correction_id: String,
    pub extraction_id: String,
    pub case_id: String,
    pub document_id: Option<String>,
    pub field_name: String,
    pub original_value: Option<String>,
    pub corrected_value: String,
    pub reviewer_id: String,
    pub review_timestamp: DateTime<Utc>,
    pub correction_reason: Option<String>,
}

/// One correction as submitted by a reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionInput {
    pub extraction_id: String,
    pub field_name: String,
    #[serde(default)]
    pub original_value: Option<String>,
    pub corrected_value: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Generate a correction ID in the `corr-<8 hex>` format.
pub fn generate_correction_id() -> String {
    format!("corr-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_id_format() {
        let id = generate_correction_id();
        assert!(id.starts_with("corr-"));
        assert_eq!(id.len(), 13);
    }
}
