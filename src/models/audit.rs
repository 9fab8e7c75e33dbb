use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AuditEventType;

/// Append-only record of a state-changing action.
///
/// Written by the component performing the action; never read back by the
/// pipeline core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub case_id: String,
    pub event_type: AuditEventType,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    /// JSON snapshot of the payload that triggered the action.
    pub payload: String,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEvent {
    /// Build an audit event with a fresh id and the current timestamp.
    /// The actor defaults to "system" when none is supplied.
    pub fn new(
        case_id: &str,
        event_type: AuditEventType,
        actor: Option<&str>,
        payload: &serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            case_id: case_id.to_string(),
            event_type,
            actor: actor.unwrap_or("system").to_string(),
            timestamp: Utc::now(),
            payload: payload.to_string(),
            source_ip: None,
            user_agent: None,
        }
    }
}
