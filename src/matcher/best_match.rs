use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info, instrument};

use super::error::MatchError;
use super::options::MatchOptions;
use super::selector::BestMatchSelector;
use super::types::{MatchDecision, MatchMode};
use crate::biometric::{BiometricTemplate, ProbeSample};
use crate::compare::{PairComparator, compare};
use crate::hashing::payload_digest_hex;

/// Compares `probe` against every template and returns the best match.
///
/// Candidate failures are collected on the decision rather than returned.
/// With `concurrency > 1` comparisons overlap, but results are still folded
/// in enumeration order. A cancelled run returns what it had so far.
#[instrument(
    skip_all,
    fields(modality = %probe.modality, templates = templates.len())
)]
pub async fn find_best_match(
    comparator: &dyn PairComparator,
    probe: &ProbeSample,
    templates: &[BiometricTemplate],
    options: &MatchOptions,
) -> Result<MatchDecision, MatchError> {
    probe.validate(options.descriptor_dim)?;
    let probe_digest = payload_digest_hex(&probe.payload);

    if templates.is_empty() {
        debug!("No templates enrolled, skipping comparator");
        return Ok(MatchDecision::no_templates(probe.modality, probe_digest));
    }

    let concurrency = options.effective_concurrency();
    let mode = if concurrency > 1 {
        MatchMode::Concurrent
    } else {
        MatchMode::Sequential
    };
    let call_timeout = options.call_timeout;

    let mut selector = BestMatchSelector::new(templates);
    let mut results = std::pin::pin!(
        stream::iter(0..templates.len())
            .map(|index| {
                let template = &templates[index];
                async move { (index, compare(comparator, probe, template, call_timeout).await) }
            })
            .buffered(concurrency)
    );

    let mut cancel = options.cancel.clone();
    let cancelled = loop {
        let next = match cancel.as_mut() {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => break true,
                item = results.next() => item,
            },
            None => results.next().await,
        };
        match next {
            Some((index, result)) => selector.push(index, result),
            None => break false,
        }
    };

    let decision = selector.finish(probe.modality, mode, cancelled, probe_digest);
    info!(
        matched = decision.matched,
        compared = decision.candidates_compared,
        errors = decision.errors.len(),
        cancelled = decision.cancelled,
        mode = decision.mode.as_str(),
        "Batch match complete"
    );
    Ok(decision)
}
