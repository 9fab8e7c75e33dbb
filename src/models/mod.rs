pub mod audit;
pub mod case;
pub mod correction;
pub mod document;
pub mod enums;
pub mod extraction;

pub use audit::AuditEvent;
pub use case::{Case, NewCase};
pub use correction::{CorrectionInput, FieldCorrection};
pub use document::Document;
pub use extraction::{ExtractedField, RawField};
