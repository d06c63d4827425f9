//! Batch-first matching with a per-candidate fallback for cold remote services.
//!
//! A remote comparator that scales to zero usually rejects the first batch
//! call. The controller then pings it awake, waits, and retries every
//! candidate one by one through the matcher.

pub mod controller;


pub use controller::{FallbackConfig, FallbackController, FallbackRun, FallbackState};

use async_trait::async_trait;

use crate::biometric::{BiometricTemplate, SamplePayload};
use crate::compare::{ComparatorError, ComparisonResult};

#[derive(Debug, Clone, Default)]
/// What a batch endpoint returned for one probe.
pub struct BatchOutcome {
    /// Per-candidate results, in any order. May be empty.
    pub results: Vec<ComparisonResult>,
    /// The service's own pick, used when `results` is empty.
    pub best_match: Option<ComparisonResult>,
    pub total_compared: usize,
}

#[async_trait]
/// A comparator that can score a probe against many templates in one call.
pub trait BatchComparator: Send + Sync {
    async fn batch_compare(
        &self,
        probe: &SamplePayload,
        templates: &[BiometricTemplate],
    ) -> Result<BatchOutcome, ComparatorError>;

    /// Lightweight request that nudges a sleeping service awake.
    async fn wake(&self) -> Result<(), ComparatorError>;
}
