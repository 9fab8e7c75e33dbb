use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::DocumentStatus;

/// One uploaded file tied to exactly one case.
///
/// `(case_id, content_hash)` is unique: the same bytes uploaded twice for a
/// case resolve to the existing record rather than a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub case_id: String,
    pub document_type: String,
    pub storage_uri: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// Generate a document ID in the `doc-<12 hex>` format.
pub fn generate_document_id() -> String {
    format!("doc-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_format() {
        let id = generate_document_id();
        assert!(id.starts_with("doc-"));
        assert_eq!(id.len(), 16);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn document_ids_are_unique() {
        assert_ne!(generate_document_id(), generate_document_id());
    }
}
