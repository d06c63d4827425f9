use serde::{Deserialize, Serialize};

use crate::biometric::{Modality, SubjectProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Which path produced a decision.
pub enum MatchMode {
    /// One comparison at a time.
    Sequential,
    /// Bounded fan-out over the per-candidate path.
    Concurrent,
    /// Single call to the remote batch endpoint.
    Batch,
    /// Per-candidate retry after the batch endpoint failed.
    SequentialFallback,
    /// A template was byte-identical to the probe; nothing else was compared.
    ExactDuplicate,
    /// The store had no templates for the modality.
    NoTemplates,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Sequential => "sequential",
            MatchMode::Concurrent => "concurrent",
            MatchMode::Batch => "batch",
            MatchMode::SequentialFallback => "sequential_fallback",
            MatchMode::ExactDuplicate => "exact_duplicate",
            MatchMode::NoTemplates => "no_templates",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One candidate whose comparison failed.
pub struct CandidateError {
    pub candidate_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
/// The winning template of a matched decision.
pub struct MatchWinner {
    pub template_id: String,
    pub subject: SubjectProfile,
    pub score: f64,
    pub confidence: f64,
    pub distance: Option<f64>,
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq)]
/// Highest score seen among all successful comparisons, matched or not.
pub struct BestObserved {
    pub template_id: String,
    pub score: f64,
    pub confidence: f64,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
/// Raw outcome of a batch verification, before threshold policy is applied.
pub struct MatchDecision {
    pub modality: Modality,
    pub matched: bool,
    pub winner: Option<MatchWinner>,
    /// Successful comparisons only; failed candidates are in `errors`.
    pub candidates_compared: usize,
    pub errors: Vec<CandidateError>,
    pub best_observed: Option<BestObserved>,
    pub mode: MatchMode,
    /// Set when a cancel signal cut the batch short.
    pub cancelled: bool,
    /// Hex BLAKE3 digest of the probe payload.
    pub probe_digest: String,
}

impl MatchDecision {
    pub fn no_templates(modality: Modality, probe_digest: String) -> Self {
        Self {
            modality,
            matched: false,
            winner: None,
            candidates_compared: 0,
            errors: Vec::new(),
            best_observed: None,
            mode: MatchMode::NoTemplates,
            cancelled: false,
            probe_digest,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds stored templates that never reached the comparator.
    ///
    /// A listing made only of such rows is a batch where every candidate
    /// failed, not an empty store.
    pub fn with_unusable(mut self, errors: Vec<CandidateError>) -> Self {
        if errors.is_empty() {
            return self;
        }
        if self.is_no_templates() {
            self.mode = MatchMode::Sequential;
        }
        self.errors.extend(errors);
        self
    }

    pub fn is_no_templates(&self) -> bool {
        self.mode == MatchMode::NoTemplates
    }
}
