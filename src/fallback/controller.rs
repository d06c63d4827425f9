use std::fmt;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{BatchComparator, BatchOutcome};
use crate::biometric::{BiometricTemplate, ProbeSample};
use crate::compare::{ComparatorError, ComparisonResult, PairComparator, find_exact_duplicate};
use crate::constants::{DEFAULT_BATCH_TIMEOUT, DEFAULT_WAKE_DELAY};
use crate::hashing::payload_digest_hex;
use crate::matcher::{
    BestMatchSelector, CancelSignal, MatchDecision, MatchError, MatchMode, MatchOptions,
    find_best_match,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a fallback run is.
pub enum FallbackState {
    /// Trying the single batch call.
    BatchMode,
    /// Batch failed; wake probe sent, waiting out the delay.
    WakingRemote,
    /// Comparing candidates one by one.
    SequentialMode,
    Done,
}

impl FallbackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackState::BatchMode => "batch_mode",
            FallbackState::WakingRemote => "waking_remote",
            FallbackState::SequentialMode => "sequential_mode",
            FallbackState::Done => "done",
        }
    }
}

impl fmt::Display for FallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Pause between the wake probe and the sequential retry.
    pub wake_delay: Duration,
    /// Upper bound on the batch call.
    pub batch_timeout: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            wake_delay: DEFAULT_WAKE_DELAY,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }
}

impl FallbackConfig {
    pub fn with_wake_delay(mut self, delay: Duration) -> Self {
        self.wake_delay = delay;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
/// Decision plus the path taken to reach it.
pub struct FallbackRun {
    pub decision: MatchDecision,
    /// Every state visited, in order, ending in `Done`.
    pub states: Vec<FallbackState>,
    /// Why the batch attempt was abandoned, if it was.
    pub batch_error: Option<ComparatorError>,
}

#[derive(Debug, Clone, Default)]
/// Runs batch-first matching against a remote comparator.
pub struct FallbackController {
    config: FallbackConfig,
}

impl FallbackController {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Batch attempt, then on failure wake, wait and retry per candidate.
    ///
    /// The sequential path yields the same decision a healthy batch call
    /// would have produced for the same inputs.
    #[instrument(
        skip_all,
        fields(modality = %probe.modality, templates = templates.len())
    )]
    pub async fn run(
        &self,
        comparator: &dyn PairComparator,
        batch: &dyn BatchComparator,
        probe: &ProbeSample,
        templates: &[BiometricTemplate],
        options: &MatchOptions,
    ) -> Result<FallbackRun, MatchError> {
        probe.validate(options.descriptor_dim)?;
        let probe_digest = payload_digest_hex(&probe.payload);
        let mut states = vec![FallbackState::BatchMode];

        if templates.is_empty() {
            transition(&mut states, FallbackState::Done);
            return Ok(FallbackRun {
                decision: MatchDecision::no_templates(probe.modality, probe_digest),
                states,
                batch_error: None,
            });
        }

        if let Some(index) = find_exact_duplicate(probe, templates) {
            debug!(
                template_id = %templates[index].template_id,
                "Exact duplicate payload, skipping batch call"
            );
            let mut selector = BestMatchSelector::new(templates);
            selector.push(
                index,
                ComparisonResult::exact(&templates[index].template_id, probe.modality),
            );
            transition(&mut states, FallbackState::Done);
            return Ok(FallbackRun {
                decision: selector.finish(
                    probe.modality,
                    MatchMode::ExactDuplicate,
                    false,
                    probe_digest,
                ),
                states,
                batch_error: None,
            });
        }

        let mut cancel = options.cancel.clone();
        let attempt = until_cancelled(
            cancel.as_mut(),
            tokio::time::timeout(
                self.config.batch_timeout,
                batch.batch_compare(&probe.payload, templates),
            ),
        )
        .await;

        let batch_error = match attempt {
            None => {
                transition(&mut states, FallbackState::Done);
                return Ok(cancelled_run(probe, templates, MatchMode::Batch, probe_digest, states));
            }
            Some(Ok(Ok(outcome))) => {
                transition(&mut states, FallbackState::Done);
                return Ok(FallbackRun {
                    decision: fold_outcome(probe, templates, outcome, probe_digest),
                    states,
                    batch_error: None,
                });
            }
            Some(Ok(Err(e))) => e,
            Some(Err(_)) => ComparatorError::Timeout {
                after: self.config.batch_timeout,
            },
        };

        warn!(error = %batch_error, "Batch comparison failed, waking remote comparator");
        transition(&mut states, FallbackState::WakingRemote);

        let woke = match until_cancelled(cancel.as_mut(), batch.wake()).await {
            Some(Err(e)) => {
                debug!(error = %e, "Wake probe failed");
                true
            }
            Some(Ok(())) => true,
            None => false,
        };

        let slept = woke
            && until_cancelled(cancel.as_mut(), tokio::time::sleep(self.config.wake_delay))
                .await
                .is_some();
        if !slept {
            transition(&mut states, FallbackState::Done);
            let mut run = cancelled_run(
                probe,
                templates,
                MatchMode::SequentialFallback,
                probe_digest,
                states,
            );
            run.batch_error = Some(batch_error);
            return Ok(run);
        }

        transition(&mut states, FallbackState::SequentialMode);
        let decision = find_best_match(comparator, probe, templates, options)
            .await?
            .with_mode(MatchMode::SequentialFallback);
        transition(&mut states, FallbackState::Done);

        Ok(FallbackRun {
            decision,
            states,
            batch_error: Some(batch_error),
        })
    }
}

fn transition(states: &mut Vec<FallbackState>, next: FallbackState) {
    if let Some(from) = states.last() {
        info!(from = %from, to = %next, "Fallback transition");
    }
    states.push(next);
}

/// `None` if `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: Option<&mut CancelSignal>, fut: F) -> Option<F::Output> {
    match cancel {
        Some(signal) => tokio::select! {
            biased;
            _ = signal.cancelled() => None,
            out = fut => Some(out),
        },
        None => Some(fut.await),
    }
}

fn cancelled_run(
    probe: &ProbeSample,
    templates: &[BiometricTemplate],
    mode: MatchMode,
    probe_digest: String,
    states: Vec<FallbackState>,
) -> FallbackRun {
    FallbackRun {
        decision: BestMatchSelector::new(templates).finish(probe.modality, mode, true, probe_digest),
        states,
        batch_error: None,
    }
}

/// Folds a batch response in enumeration order, the same way the sequential path does.
fn fold_outcome(
    probe: &ProbeSample,
    templates: &[BiometricTemplate],
    outcome: BatchOutcome,
    probe_digest: String,
) -> MatchDecision {
    let mut selector = BestMatchSelector::new(templates);

    if outcome.results.is_empty() {
        if let Some(best) = outcome.best_match {
            selector.push_by_id(best);
        }
        let mut decision = selector.finish(probe.modality, MatchMode::Batch, false, probe_digest);
        decision.candidates_compared = decision.candidates_compared.max(outcome.total_compared);
        return decision;
    }

    let mut ordered: Vec<(usize, ComparisonResult)> = outcome
        .results
        .into_iter()
        .filter_map(|result| match selector.index_of(&result.template_id) {
            Some(index) => Some((index, result)),
            None => {
                warn!(
                    template_id = %result.template_id,
                    "Batch response names a template that was not submitted"
                );
                None
            }
        })
        .collect();
    ordered.sort_by_key(|(index, _)| *index);

    for (index, result) in ordered {
        selector.push(index, result);
    }
    selector.finish(probe.modality, MatchMode::Batch, false, probe_digest)
}
