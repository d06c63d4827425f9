use serde::{Deserialize, Serialize};

use super::error::ComparatorError;
use crate::biometric::Modality;
use crate::constants::{EXACT_MATCH_CONFIDENCE, distance_to_confidence};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// What a comparator reports for one probe/template pair.
///
/// `score` is higher-is-better for every modality so ranking is uniform.
pub struct RawComparison {
    pub matched: bool,
    pub score: f64,
    /// Percentage, 0-100.
    pub confidence: f64,
    /// Descriptor distance, for distance-based comparators only.
    pub distance: Option<f64>,
}

impl RawComparison {
    /// Builds a distance-based result: `score = 1 - distance`.
    pub fn from_distance(distance: f64, threshold: f64) -> Self {
        Self {
            matched: distance <= threshold,
            score: 1.0 - distance,
            confidence: distance_to_confidence(distance),
            distance: Some(distance),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Normalized outcome of one pairwise comparison.
pub struct ComparisonResult {
    pub template_id: String,
    pub matched: bool,
    pub score: f64,
    pub confidence: f64,
    pub distance: Option<f64>,
    /// Set when probe and template payloads were byte-identical.
    pub exact: bool,
    pub error: Option<ComparatorError>,
}

impl ComparisonResult {
    pub fn from_raw(template_id: impl Into<String>, raw: RawComparison) -> Self {
        Self {
            template_id: template_id.into(),
            matched: raw.matched,
            score: raw.score,
            confidence: raw.confidence.clamp(0.0, 100.0),
            distance: raw.distance,
            exact: false,
            error: None,
        }
    }

    /// Byte-identical payloads: an immediate 100% match.
    pub fn exact(template_id: impl Into<String>, modality: Modality) -> Self {
        let (score, distance) = match modality {
            Modality::Face => (1.0, Some(0.0)),
            Modality::Fingerprint => (EXACT_MATCH_CONFIDENCE, None),
        };
        Self {
            template_id: template_id.into(),
            matched: true,
            score,
            confidence: EXACT_MATCH_CONFIDENCE,
            distance,
            exact: true,
            error: None,
        }
    }

    pub fn failed(template_id: impl Into<String>, error: ComparatorError) -> Self {
        Self {
            template_id: template_id.into(),
            matched: false,
            score: f64::NEG_INFINITY,
            confidence: 0.0,
            distance: None,
            exact: false,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
