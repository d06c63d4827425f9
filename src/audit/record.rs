use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::biometric::Modality;
use crate::decision::Verdict;
use crate::matcher::MatchDecision;
use crate::verifier::VerifyContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One verification outcome, as persisted by the audit sink.
pub struct AuditRecord {
    pub record_id: Uuid,
    pub session_id: Option<String>,
    pub course_id: Option<String>,
    pub modality: Modality,
    pub matched: bool,
    pub subject_id: Option<String>,
    pub confidence: Option<f64>,
    pub candidates_compared: usize,
    pub error_count: usize,
    /// Path that produced the decision, e.g. `batch` or `sequential_fallback`.
    pub mode: String,
    /// Hex BLAKE3 digest of the probe payload.
    pub probe_digest: String,
    pub requested_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(context: &VerifyContext, decision: &MatchDecision, verdict: &Verdict) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            session_id: context.session_id.clone(),
            course_id: context.course_id.clone(),
            modality: decision.modality,
            matched: verdict.matched,
            subject_id: verdict.subject_id().map(str::to_string),
            confidence: verdict.confidence,
            candidates_compared: decision.candidates_compared,
            error_count: decision.errors.len(),
            mode: decision.mode.as_str().to_string(),
            probe_digest: decision.probe_digest.clone(),
            requested_at: context.requested_at,
            recorded_at: Utc::now(),
        }
    }
}
