//! Pairwise comparison of a probe against one stored template.
//!
//! Every transport (in-process descriptor distance, remote HTTP service) sits
//! behind [`PairComparator`]. Callers go through [`compare`], which applies
//! the exact-duplicate short-circuit and the per-call timeout, and turns
//! failures into a [`ComparisonResult`] carrying the error instead of
//! propagating it. One bad candidate never aborts a batch.

pub mod descriptor;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod readiness;
pub mod remote;
pub mod types;


pub use descriptor::{DescriptorComparator, euclidean_distance};
pub use error::ComparatorError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBatchMode, MockComparator};
pub use readiness::ReadinessGate;
pub use remote::{RemoteComparator, RemoteComparatorConfig};
pub use types::{ComparisonResult, RawComparison};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::biometric::{BiometricTemplate, Modality, ProbeSample, SamplePayload, Transport};
use crate::fallback::BatchComparator;
use crate::hashing::payload_digest;

#[async_trait]
/// One comparison primitive. Modality and transport are fixed at construction.
pub trait PairComparator: Send + Sync {
    fn modality(&self) -> Modality;

    fn transport(&self) -> Transport;

    /// Compares two payloads. Implementations may assume `modality` matches.
    async fn compare_payloads(
        &self,
        probe: &SamplePayload,
        template: &SamplePayload,
    ) -> Result<RawComparison, ComparatorError>;

    /// Idempotently prepares the underlying resource. Safe under concurrent calls.
    async fn ensure_ready(&self) -> Result<(), ComparatorError>;

    /// Liveness of the underlying resource. A failure marks it for reinitialization.
    async fn health_check(&self) -> Result<(), ComparatorError>;

    fn is_ready(&self) -> bool;

    /// Batch endpoint, for comparators that have one.
    fn as_batch(&self) -> Option<&dyn BatchComparator> {
        None
    }
}

/// Checks liveness, then reinitializes if the check found the resource stale.
///
/// Unlike a bare [`PairComparator::ensure_ready`], this notices a resource
/// that went away after it was first marked ready.
pub async fn refresh_readiness(comparator: &dyn PairComparator) -> Result<(), ComparatorError> {
    comparator.health_check().await?;
    comparator.ensure_ready().await
}

/// Returns the index of the first template whose payload is byte-identical to the probe.
pub fn find_exact_duplicate(probe: &ProbeSample, templates: &[BiometricTemplate]) -> Option<usize> {
    let probe_digest = payload_digest(&probe.payload);
    templates.iter().position(|t| {
        t.modality == probe.modality
            && payload_digest(&t.payload) == probe_digest
            && t.payload.is_byte_identical(&probe.payload)
    })
}

/// Compares `probe` with `template`, never failing.
pub async fn compare(
    comparator: &dyn PairComparator,
    probe: &ProbeSample,
    template: &BiometricTemplate,
    timeout: Duration,
) -> ComparisonResult {
    let template_id = template.template_id.as_str();

    if template.modality != probe.modality {
        return ComparisonResult::failed(
            template_id,
            ComparatorError::MalformedTemplate {
                reason: format!(
                    "{} template offered for a {} probe",
                    template.modality, probe.modality
                ),
            },
        );
    }

    if probe.payload.is_byte_identical(&template.payload) {
        debug!(template_id, "Exact duplicate payload, skipping comparator");
        return ComparisonResult::exact(template_id, probe.modality);
    }

    match tokio::time::timeout(
        timeout,
        comparator.compare_payloads(&probe.payload, &template.payload),
    )
    .await
    {
        Ok(Ok(raw)) => ComparisonResult::from_raw(template_id, raw),
        Ok(Err(e)) => {
            warn!(template_id, error = %e, "Comparison failed");
            ComparisonResult::failed(template_id, e)
        }
        Err(_) => {
            warn!(template_id, ?timeout, "Comparison timed out");
            ComparisonResult::failed(template_id, ComparatorError::Timeout { after: timeout })
        }
    }
}
