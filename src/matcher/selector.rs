use std::collections::HashMap;

use tracing::warn;

use super::types::{BestObserved, CandidateError, MatchDecision, MatchMode, MatchWinner};
use crate::biometric::{BiometricTemplate, Modality};
use crate::compare::ComparisonResult;

/// Folds comparison results into a [`MatchDecision`].
///
/// Results must be pushed in template enumeration order. A candidate replaces
/// the current best only with a strictly higher score, so the first one wins
/// ties. Exact duplicates outrank any scored comparison.
pub struct BestMatchSelector<'a> {
    templates: &'a [BiometricTemplate],
    index_by_id: HashMap<&'a str, usize>,
    best: Option<(usize, ComparisonResult)>,
    best_observed: Option<ComparisonResult>,
    compared: usize,
    errors: Vec<CandidateError>,
}

impl<'a> BestMatchSelector<'a> {
    pub fn new(templates: &'a [BiometricTemplate]) -> Self {
        let mut index_by_id = HashMap::with_capacity(templates.len());
        for (i, t) in templates.iter().enumerate() {
            index_by_id.entry(t.template_id.as_str()).or_insert(i);
        }
        Self {
            templates,
            index_by_id,
            best: None,
            best_observed: None,
            compared: 0,
            errors: Vec::new(),
        }
    }

    /// Position of `template_id` in the enumeration, if known.
    pub fn index_of(&self, template_id: &str) -> Option<usize> {
        self.index_by_id.get(template_id).copied()
    }

    pub fn push(&mut self, index: usize, result: ComparisonResult) {
        if let Some(err) = &result.error {
            self.errors.push(CandidateError {
                candidate_id: result.template_id.clone(),
                reason: err.to_string(),
            });
            return;
        }

        self.compared += 1;

        if Self::outranks(&result, self.best_observed.as_ref()) {
            self.best_observed = Some(result.clone());
        }

        if result.matched && Self::outranks(&result, self.best.as_ref().map(|(_, r)| r)) {
            self.best = Some((index, result));
        }
    }

    /// Pushes a result identified only by template id (batch responses).
    pub fn push_by_id(&mut self, result: ComparisonResult) {
        match self.index_of(&result.template_id) {
            Some(index) => self.push(index, result),
            None => warn!(
                template_id = %result.template_id,
                "Ignoring result for a template that was not submitted"
            ),
        }
    }

    /// Exact duplicates rank above every scored result whatever its `score`:
    /// an exact result's score is the service-independent 100 (or `1.0` for
    /// descriptors) and is not comparable with a service's own scale.
    fn outranks(candidate: &ComparisonResult, current: Option<&ComparisonResult>) -> bool {
        match current {
            None => true,
            Some(best) => {
                (candidate.exact && !best.exact)
                    || (candidate.exact == best.exact && candidate.score > best.score)
            }
        }
    }

    pub fn compared(&self) -> usize {
        self.compared
    }

    pub fn finish(
        self,
        modality: Modality,
        mode: MatchMode,
        cancelled: bool,
        probe_digest: String,
    ) -> MatchDecision {
        let winner = self.best.and_then(|(index, result)| {
            self.templates.get(index).map(|template| MatchWinner {
                template_id: template.template_id.clone(),
                subject: template.subject.clone(),
                score: result.score,
                confidence: result.confidence,
                distance: result.distance,
                exact: result.exact,
            })
        });

        MatchDecision {
            modality,
            matched: winner.is_some(),
            winner,
            candidates_compared: self.compared,
            errors: self.errors,
            best_observed: self.best_observed.map(|r| BestObserved {
                template_id: r.template_id,
                score: r.score,
                confidence: r.confidence,
                distance: r.distance,
            }),
            mode,
            cancelled,
            probe_digest,
        }
    }
}
