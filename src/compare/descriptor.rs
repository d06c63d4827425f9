use async_trait::async_trait;
use tracing::trace;

use super::PairComparator;
use super::error::ComparatorError;
use super::readiness::ReadinessGate;
use super::types::RawComparison;
use crate::biometric::{Modality, SamplePayload, Transport};
use crate::constants::DEFAULT_FACE_DISTANCE_THRESHOLD;

/// Euclidean distance between two descriptors, accumulated in `f64`.
///
/// Returns `None` on a length mismatch.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum();
    Some(sum.sqrt())
}

/// In-process face comparator over client-extracted descriptors.
#[derive(Debug)]
pub struct DescriptorComparator {
    distance_threshold: f64,
    descriptor_dim: usize,
    gate: ReadinessGate,
}

impl DescriptorComparator {
    pub fn new(distance_threshold: f64, descriptor_dim: usize) -> Self {
        Self {
            distance_threshold,
            descriptor_dim,
            gate: ReadinessGate::new(),
        }
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    pub fn descriptor_dim(&self) -> usize {
        self.descriptor_dim
    }

    fn descriptors<'a>(
        probe: &'a SamplePayload,
        template: &'a SamplePayload,
    ) -> Result<(&'a [f32], &'a [f32]), ComparatorError> {
        let probe = probe
            .as_descriptor()
            .ok_or_else(|| ComparatorError::MalformedTemplate {
                reason: "probe is not a descriptor".to_string(),
            })?;
        let template =
            template
                .as_descriptor()
                .ok_or_else(|| ComparatorError::MalformedTemplate {
                    reason: format!("expected descriptor, found {}", template.kind()),
                })?;
        Ok((probe, template))
    }
}

impl Default for DescriptorComparator {
    fn default() -> Self {
        Self::new(
            DEFAULT_FACE_DISTANCE_THRESHOLD,
            crate::constants::FACE_DESCRIPTOR_DIM,
        )
    }
}

#[async_trait]
impl PairComparator for DescriptorComparator {
    fn modality(&self) -> Modality {
        Modality::Face
    }

    fn transport(&self) -> Transport {
        Transport::Local
    }

    async fn compare_payloads(
        &self,
        probe: &SamplePayload,
        template: &SamplePayload,
    ) -> Result<RawComparison, ComparatorError> {
        let (probe, template) = Self::descriptors(probe, template)?;

        if template.len() != self.descriptor_dim {
            return Err(ComparatorError::MalformedTemplate {
                reason: format!(
                    "descriptor dimension {} (expected {})",
                    template.len(),
                    self.descriptor_dim
                ),
            });
        }
        if template.iter().any(|v| !v.is_finite()) {
            return Err(ComparatorError::MalformedTemplate {
                reason: "descriptor contains non-finite values".to_string(),
            });
        }

        let distance =
            euclidean_distance(probe, template).ok_or_else(|| ComparatorError::MalformedTemplate {
                reason: format!(
                    "descriptor dimension {} does not match probe {}",
                    template.len(),
                    probe.len()
                ),
            })?;

        trace!(distance, threshold = self.distance_threshold, "Descriptor distance");
        Ok(RawComparison::from_distance(distance, self.distance_threshold))
    }

    async fn ensure_ready(&self) -> Result<(), ComparatorError> {
        let dim = self.descriptor_dim;
        self.gate
            .ensure(|| async move {
                if dim == 0 {
                    return Err(ComparatorError::NotReady {
                        reason: "descriptor dimension is zero".to_string(),
                    });
                }
                Ok(())
            })
            .await
    }

    async fn health_check(&self) -> Result<(), ComparatorError> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }
}
