use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::biometric::SubjectProfile;
use crate::matcher::CandidateError;

pub const BIOMATCH_STATUS_HEADER: &str = "X-Biomatch-Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Matched,
    NoMatch,
    NoTemplates,
    Error,
}

impl VerdictStatus {
    /// Value for the [`BIOMATCH_STATUS_HEADER`] response header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            VerdictStatus::Matched => "MATCHED",
            VerdictStatus::NoMatch => "NO_MATCH",
            VerdictStatus::NoTemplates => "NO_TEMPLATES",
            VerdictStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_header_value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Public identity of the matched subject, flattened for callers.
pub struct VerdictSubject {
    pub id: String,
    pub display_name: String,
    #[serde(flatten)]
    pub public_fields: BTreeMap<String, String>,
}

impl From<&SubjectProfile> for VerdictSubject {
    fn from(profile: &SubjectProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            public_fields: profile.public_fields.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Caller-facing verification result. Never carries template payloads.
pub struct Verdict {
    /// `false` only when the request itself failed.
    pub success: bool,
    pub matched: bool,
    pub status: VerdictStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<VerdictSubject>,
    /// Percentage rounded to one decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CandidateError>,
    /// Set when the run was cancelled before every candidate was compared.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Verdict {
    /// Verdict for a request that could not be evaluated at all.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            matched: false,
            status: VerdictStatus::Error,
            subject: None,
            confidence: None,
            score: None,
            message: message.into(),
            errors: Vec::new(),
            partial: false,
        }
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject.as_ref().map(|s| s.id.as_str())
    }
}
