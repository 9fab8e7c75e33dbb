//! Environment-sourced worker configuration.
//!
//! One `Config` is built at startup and passed explicitly to the components
//! that need it; there are no ambient process-wide settings. The confidence
//! threshold lives here and nowhere else: the reconciler and the case
//! read path both consume this single value.

use std::collections::HashMap;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "LendingOps";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default confidence threshold below which a document needs human review.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Default bounded timeout for the extraction engine call.
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 120;

/// Processor identifier used whenever no real processor is configured.
pub const GENERIC_PROCESSOR: &str = "generic-form-processor";

#[derive(Debug, Clone)]
pub struct Config {
    /// Threshold an extraction batch's average confidence is compared
    /// against, for both document and case status.
    pub confidence_threshold: f64,
    /// Skip all external calls and log intended effects instead. This is a
    /// first-class operating mode with identical control flow to live runs.
    pub mock_mode: bool,
    /// Base URL of the document extraction service.
    pub extraction_endpoint: String,
    /// Processor for identity documents (drivers license, passport).
    pub identity_processor: String,
    /// Processor for form-like documents (paystubs, statements, tax forms).
    pub form_processor: String,
    /// Timeout applied to each extraction call.
    pub extraction_timeout_secs: u64,
    /// Path of the SQLite analytical store.
    pub database_path: PathBuf,
}

impl Config {
    /// Build configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            confidence_threshold: std::env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            mock_mode: std::env::var("MOCK_MODE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            extraction_endpoint: std::env::var("DOCAI_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8089".to_string()),
            identity_processor: std::env::var("DOCAI_IDENTITY_PROCESSOR")
                .unwrap_or_else(|_| GENERIC_PROCESSOR.to_string()),
            form_processor: std::env::var("DOCAI_FORM_PROCESSOR")
                .unwrap_or_else(|_| GENERIC_PROCESSOR.to_string()),
            extraction_timeout_secs: std::env::var("EXTRACTION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXTRACTION_TIMEOUT_SECS),
            database_path: std::env::var("LENDINGOPS_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_database_path()),
        }
    }

    /// Map a declared document type to its processor identifier.
    ///
    /// Unmapped types fall back to the form processor rather than failing:
    /// a generic parse beats no parse for triage purposes.
    pub fn processor_for(&self, document_type: &str) -> &str {
        match document_type {
            "drivers_license" | "passport" => &self.identity_processor,
            "paystub" | "paystub_recent_2" | "bank_statement_30days" | "bank_statement_60days"
            | "w2" | "w2_2years" | "tax_returns_2years" => &self.form_processor,
            _ => &self.form_processor,
        }
    }

    /// Full processor mapping, for startup logging.
    pub fn processor_map(&self) -> HashMap<&'static str, &str> {
        let mut map = HashMap::new();
        for doc_type in [
            "drivers_license",
            "passport",
            "paystub",
            "paystub_recent_2",
            "bank_statement_30days",
            "bank_statement_60days",
            "w2",
            "w2_2years",
            "tax_returns_2years",
        ] {
            map.insert(doc_type, self.processor_for(doc_type));
        }
        map
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            mock_mode: false,
            extraction_endpoint: "http://localhost:8089".to_string(),
            identity_processor: GENERIC_PROCESSOR.to_string(),
            form_processor: GENERIC_PROCESSOR.to_string(),
            extraction_timeout_secs: DEFAULT_EXTRACTION_TIMEOUT_SECS,
            database_path: default_database_path(),
        }
    }
}

/// Default store location: ~/LendingOps/lendingops.db
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(APP_NAME)
}

fn default_database_path() -> PathBuf {
    app_data_dir().join("lendingops.db")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,lendingops=debug".to_string()
}
