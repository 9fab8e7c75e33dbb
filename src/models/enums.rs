use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(LoanType {
    Auto => "auto",
    Personal => "personal",
    Mortgage => "mortgage",
    Other => "other",
});

str_enum!(CaseStatus {
    Submitted => "SUBMITTED",
    Extracting => "EXTRACTING",
    ReadyForReview => "READY_FOR_REVIEW",
    NeedsReview => "NEEDS_REVIEW",
    ReadyForDecision => "READY_FOR_DECISION",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

str_enum!(DocumentStatus {
    Uploaded => "UPLOADED",
    Extracting => "EXTRACTING",
    Extracted => "EXTRACTED",
    NeedsReview => "NEEDS_REVIEW",
});

str_enum!(AuditEventType {
    CaseCreated => "CASE_CREATED",
    DocumentUploaded => "DOCUMENT_UPLOADED",
    ReviewCompleted => "REVIEW_COMPLETED",
});

impl CaseStatus {
    /// APPROVED and REJECTED are terminal: stale extraction events must
    /// never move a case out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn loan_type_round_trip() {
        for (variant, s) in [
            (LoanType::Auto, "auto"),
            (LoanType::Personal, "personal"),
            (LoanType::Mortgage, "mortgage"),
            (LoanType::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(LoanType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn case_status_round_trip() {
        for (variant, s) in [
            (CaseStatus::Submitted, "SUBMITTED"),
            (CaseStatus::Extracting, "EXTRACTING"),
            (CaseStatus::ReadyForReview, "READY_FOR_REVIEW"),
            (CaseStatus::NeedsReview, "NEEDS_REVIEW"),
            (CaseStatus::ReadyForDecision, "READY_FOR_DECISION"),
            (CaseStatus::Approved, "APPROVED"),
            (CaseStatus::Rejected, "REJECTED"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(CaseStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn document_status_round_trip() {
        for (variant, s) in [
            (DocumentStatus::Uploaded, "UPLOADED"),
            (DocumentStatus::Extracting, "EXTRACTING"),
            (DocumentStatus::Extracted, "EXTRACTED"),
            (DocumentStatus::NeedsReview, "NEEDS_REVIEW"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(DocumentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn only_approved_and_rejected_are_terminal() {
        assert!(CaseStatus::Approved.is_terminal());
        assert!(CaseStatus::Rejected.is_terminal());
        assert!(!CaseStatus::Submitted.is_terminal());
        assert!(!CaseStatus::NeedsReview.is_terminal());
        assert!(!CaseStatus::ReadyForDecision.is_terminal());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(LoanType::from_str("boat").is_err());
        assert!(CaseStatus::from_str("unknown").is_err());
        assert!(DocumentStatus::from_str("").is_err());
    }
}
