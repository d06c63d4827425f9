use tracing::debug;

use super::verdict::{Verdict, VerdictStatus, VerdictSubject};
use crate::biometric::{Modality, Transport};
use crate::constants::{
    DEFAULT_FACE_MIN_CONFIDENCE, DEFAULT_FINGERPRINT_MIN_CONFIDENCE,
    DEFAULT_REMOTE_FACE_MIN_CONFIDENCE, round_one_decimal,
};
use crate::matcher::{BestObserved, MatchDecision};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Acceptance threshold applied on top of the comparator's own `matched` flag.
pub struct DecisionPolicy {
    /// Minimum rounded confidence, inclusive.
    pub min_confidence: f64,
}

impl DecisionPolicy {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    /// Default threshold for a comparator of the given kind.
    pub fn for_comparator(modality: Modality, transport: Transport) -> Self {
        let min_confidence = match (modality, transport) {
            (Modality::Face, Transport::Local) => DEFAULT_FACE_MIN_CONFIDENCE,
            (Modality::Face, Transport::Remote) => DEFAULT_REMOTE_FACE_MIN_CONFIDENCE,
            (Modality::Fingerprint, _) => DEFAULT_FINGERPRINT_MIN_CONFIDENCE,
        };
        Self { min_confidence }
    }

    pub fn accepts(&self, rounded_confidence: f64) -> bool {
        rounded_confidence >= self.min_confidence
    }
}

/// Applies `policy` to a raw decision.
///
/// A cancelled run never verifies an identity, since an uncompared candidate
/// could have scored higher.
pub fn decide(decision: &MatchDecision, policy: &DecisionPolicy) -> Verdict {
    let modality = decision.modality;

    if decision.is_no_templates() {
        return Verdict {
            success: true,
            matched: false,
            status: VerdictStatus::NoTemplates,
            subject: None,
            confidence: None,
            score: None,
            message: format!("No registered {} templates", modality),
            errors: Vec::new(),
            partial: false,
        };
    }

    if let Some(winner) = decision.winner.as_ref().filter(|_| !decision.cancelled) {
        let confidence = round_one_decimal(winner.confidence);
        if policy.accepts(confidence) {
            return Verdict {
                success: true,
                matched: true,
                status: VerdictStatus::Matched,
                subject: Some(VerdictSubject::from(&winner.subject)),
                confidence: Some(confidence),
                score: Some(winner.score),
                message: format!(
                    "Identity verified: {} ({:.1}% confidence)",
                    winner.subject.display_name, confidence
                ),
                errors: decision.errors.clone(),
                partial: false,
            };
        }
        debug!(
            template_id = %winner.template_id,
            confidence,
            min_confidence = policy.min_confidence,
            "Best match below acceptance threshold"
        );
    }

    let mut message = no_match_message(modality, decision.best_observed.as_ref());
    if decision.best_observed.is_none() && !decision.errors.is_empty() {
        message.push_str(&format!(" ({} comparisons failed)", decision.errors.len()));
    }
    if decision.cancelled {
        message.push_str(&format!(
            "; cancelled after {} candidates",
            decision.candidates_compared + decision.errors.len()
        ));
    }

    Verdict {
        success: true,
        matched: false,
        status: VerdictStatus::NoMatch,
        subject: None,
        confidence: None,
        score: decision.best_observed.as_ref().map(|b| b.score),
        message,
        errors: decision.errors.clone(),
        partial: decision.cancelled,
    }
}

fn no_match_message(modality: Modality, best: Option<&BestObserved>) -> String {
    match best {
        Some(BestObserved {
            distance: Some(distance),
            ..
        }) => format!(
            "No matching {} found (bestDistance: {:.2})",
            modality, distance
        ),
        Some(best) => format!(
            "No matching {} found (highestSimilarity: {:.1})",
            modality, best.score
        ),
        None => format!("No matching {} found", modality),
    }
}
