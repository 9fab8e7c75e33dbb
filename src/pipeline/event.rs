//! Inbound ingestion event parsing.
//!
//! Events arrive JSON-shaped from the upstream queue collaborator. A payload
//! missing any of the four required fields is malformed for that message
//! only: redelivery cannot fix it, so the worker routes it to dead-letter
//! instead of retrying.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Malformed event payload: {0}")]
    Malformed(String),
}

/// One document-uploaded event as published by the intake surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    pub case_id: String,
    pub document_id: String,
    pub gcs_uri: String,
    pub document_type: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl IngestEvent {
    /// Parse a raw payload. Missing required fields or non-JSON bytes are
    /// permanently malformed.
    pub fn parse(payload: &[u8]) -> Result<Self, EventError> {
        let event: IngestEvent =
            serde_json::from_slice(payload).map_err(|e| EventError::Malformed(e.to_string()))?;

        for (name, value) in [
            ("case_id", &event.case_id),
            ("document_id", &event.document_id),
            ("gcs_uri", &event.gcs_uri),
            ("document_type", &event.document_type),
        ] {
            if value.is_empty() {
                return Err(EventError::Malformed(format!("empty field: {name}")));
            }
        }

        Ok(event)
    }
}
