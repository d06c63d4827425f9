use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Who asked for a verification, for the audit trail.
pub struct VerifyContext {
    pub session_id: Option<String>,
    pub course_id: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl Default for VerifyContext {
    fn default() -> Self {
        Self {
            session_id: None,
            course_id: None,
            requested_at: Utc::now(),
        }
    }
}

impl VerifyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_session(session_id: impl Into<String>, course_id: Option<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            course_id,
            requested_at: Utc::now(),
        }
    }

    /// Audit records are only written for requests tied to a session.
    pub fn is_audited(&self) -> bool {
        self.session_id.is_some()
    }
}
