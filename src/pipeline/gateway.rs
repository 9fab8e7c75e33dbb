//! Extraction gateway: wraps the external document-extraction service
//! behind a uniform trait. Raw bytes in, typed fields with confidence out.
//!
//! The gateway persists nothing; extraction and persistence stay
//! independently testable and retryable. Processor selection is a static
//! mapping on `Config`; unmapped document types fall back to the generic
//! form processor.

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RawField;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The external capability is unreachable, timed out, or returned
    /// output we cannot interpret. Transient from the pipeline's point of
    /// view: the worker retries the whole event.
    #[error("Extraction service unavailable: {0}")]
    Unavailable(String),

    #[error("Extraction service error: HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },
}

/// One extraction call: raw bytes plus the processor routing decided by
/// the gateway's static mapping.
pub struct ExtractionRequest<'a> {
    pub content: &'a [u8],
    pub mime_type: &'a str,
    pub processor_id: &'a str,
    pub document_type: &'a str,
}

pub trait ExtractionEngine: Send + Sync {
    /// Run one document through the named processor.
    ///
    /// Returns the ordered field list the processor produced. An empty list
    /// is a valid response (the caller treats it as zero confidence).
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<RawField>, ExtractionError>;
}

// ---------------------------------------------------------------------------
// HTTP engine
// ---------------------------------------------------------------------------

/// HTTP client for the document extraction service.
pub struct HttpExtractionEngine {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpExtractionEngine {
    /// Create a client with a bounded per-request timeout. The timeout is
    /// what keeps a stuck remote call from blocking the worker forever.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }
}

/// Request body for the processor's process endpoint.
#[derive(Serialize)]
struct ProcessRequest<'a> {
    processor_id: &'a str,
    mime_type: &'a str,
    /// Raw document bytes, base64-encoded.
    content: String,
}

/// Response body from the processor.
#[derive(Deserialize)]
struct ProcessResponse {
    fields: Vec<RawField>,
}

impl ExtractionEngine for HttpExtractionEngine {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<RawField>, ExtractionError> {
        let url = format!("{}/v1/process", self.base_url);
        let body = ProcessRequest {
            processor_id: request.processor_id,
            mime_type: request.mime_type,
            content: base64::engine::general_purpose::STANDARD.encode(request.content),
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Unavailable(format!(
                    "request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProcessResponse = response
            .json()
            .map_err(|e| ExtractionError::Unavailable(format!("malformed response: {e}")))?;

        tracing::debug!(
            processor_id = request.processor_id,
            fields = parsed.fields.len(),
            "Extraction call completed"
        );
        Ok(parsed.fields)
    }
}

// ---------------------------------------------------------------------------
// Mock engine
// ---------------------------------------------------------------------------

/// Canned extractions keyed by declared document type.
///
/// Selected in mock mode; control flow through the pipeline is identical
/// to the live path, only the remote call is replaced.
#[derive(Default)]
pub struct MockExtractionEngine;

impl MockExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    fn canned_fields(document_type: &str) -> Vec<RawField> {
        match document_type {
            "drivers_license" => vec![
                RawField::new("full_name", "John Doe", 0.98),
                RawField::new("date_of_birth", "1985-03-15", 0.99),
                RawField::new("license_number", "D1234567", 0.95),
                RawField::new("address", "123 Main St, Anytown, CA 12345", 0.92),
                RawField::new("expiration_date", "2027-03-15", 0.97),
                RawField::new("state", "CA", 0.99),
                RawField::new("gender", "M", 0.96),
                RawField::new("height", "5'10\"", 0.88),
            ],
            "paystub" => vec![
                RawField::new("employee_name", "John Doe", 0.96),
                RawField::new("employer_name", "Acme Corporation", 0.94),
                // Low confidence on purpose: exercises the review path.
                RawField::new("employer_ein", "12-3456789", 0.78),
                RawField::new("pay_period_start", "2024-01-01", 0.92),
                RawField::new("pay_period_end", "2024-01-15", 0.93),
                RawField::new("gross_pay", "2500.00", 0.97),
                RawField::new("net_pay", "1950.00", 0.95),
                RawField::new("ytd_gross", "7500.00", 0.89),
            ],
            "bank_statement_30days" => vec![
                RawField::new("account_holder", "John Doe", 0.97),
                RawField::new("account_number", "****1234", 0.91),
                RawField::new("statement_date", "2024-01-31", 0.98),
                RawField::new("beginning_balance", "5000.00", 0.96),
                RawField::new("ending_balance", "4750.00", 0.95),
                RawField::new("bank_name", "First National Bank", 0.99),
            ],
            _ => vec![
                RawField::new("document_date", "2024-01-15", 0.90),
                RawField::new("name", "John Doe", 0.85),
            ],
        }
    }
}

impl ExtractionEngine for MockExtractionEngine {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<RawField>, ExtractionError> {
        let fields = Self::canned_fields(request.document_type);
        tracing::info!(
            processor_id = request.processor_id,
            document_type = request.document_type,
            fields = fields.len(),
            "[MOCK] extraction"
        );
        Ok(fields)
    }
}

/// Fixed-response engine for tests.
pub struct FixedExtractionEngine {
    fields: Vec<RawField>,
}

impl FixedExtractionEngine {
    pub fn new(fields: Vec<RawField>) -> Self {
        Self { fields }
    }
}

impl ExtractionEngine for FixedExtractionEngine {
    fn extract(&self, _request: &ExtractionRequest<'_>) -> Result<Vec<RawField>, ExtractionError> {
        Ok(self.fields.clone())
    }
}

/// Build the engine for the configured operating mode.
pub fn build_engine(config: &crate::config::Config) -> Result<Box<dyn ExtractionEngine>, ExtractionError> {
    if config.mock_mode {
        tracing::info!("Using mock extraction engine");
        return Ok(Box::new(MockExtractionEngine::new()));
    }
    let engine = HttpExtractionEngine::new(&config.extraction_endpoint, config.extraction_timeout_secs)?;
    tracing::info!(endpoint = %config.extraction_endpoint, "Using HTTP extraction engine");
    Ok(Box::new(engine))
}
