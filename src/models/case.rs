use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{CaseStatus, LoanType};

/// One loan application and its lifecycle.
///
/// Status is mutated only through the reconciler/review path; case rows
/// are never deleted, only superseded by new status values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub member_id: String,
    pub loan_type: LoanType,
    pub loan_amount: f64,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for case creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub member_id: String,
    pub loan_type: LoanType,
    pub loan_amount: f64,
}

/// Generate a case ID in the externally visible `CU-YYYY-NNNNN` format.
///
/// The sequence component mixes the millisecond clock with a process-local
/// counter so two cases created in the same millisecond still get distinct
/// ids.
pub fn generate_case_id(now: DateTime<Utc>) -> String {
    static TICK: AtomicU32 = AtomicU32::new(0);
    let tick = i64::from(TICK.fetch_add(1, Ordering::Relaxed));
    let sequence = ((now.timestamp_millis() + tick) % 100_000).unsigned_abs();
    format!("CU-{}-{:05}", now.year(), sequence)
}

/// The fixed required-document set for a loan type.
///
/// Pure function of the loan type; nothing is persisted alongside the case.
pub fn required_documents(loan_type: LoanType) -> Vec<&'static str> {
    let mut docs = vec!["drivers_license"];
    match loan_type {
        LoanType::Auto => docs.extend([
            "paystub_recent_2",
            "bank_statement_30days",
            "proof_of_insurance",
        ]),
        LoanType::Personal => docs.extend(["paystub_recent_2", "bank_statement_60days"]),
        LoanType::Mortgage => docs.extend([
            "paystub_recent_2",
            "w2_2years",
            "bank_statement_60days",
            "tax_returns_2years",
        ]),
        LoanType::Other => docs.extend(["paystub_recent_2", "bank_statement_30days"]),
    }
    docs
}
