//! Cross-cutting, shared constants.
//!
//! Thresholds here are configuration defaults carried over from the deployed
//! attendance system. They are not calibrated operating points; override them
//! through [`Config`](crate::config::Config) when tuning.

use std::time::Duration;

/// Length of a face descriptor produced by the reference face-embedding model.
pub const FACE_DESCRIPTOR_DIM: usize = 128;

/// A face matches when the descriptor distance is at or below this value.
pub const DEFAULT_FACE_DISTANCE_THRESHOLD: f64 = 0.5;

/// Minimum confidence (percent) for a locally matched face.
///
/// Equivalent to [`DEFAULT_FACE_DISTANCE_THRESHOLD`] expressed on the confidence scale.
pub const DEFAULT_FACE_MIN_CONFIDENCE: f64 = 50.0;

/// Minimum confidence (percent) for a face matched by the cloud face service.
pub const DEFAULT_REMOTE_FACE_MIN_CONFIDENCE: f64 = 70.0;

/// Minimum confidence (percent) for fingerprints. The remote minutiae service
/// applies its own threshold, so the local floor is zero.
pub const DEFAULT_FINGERPRINT_MIN_CONFIDENCE: f64 = 0.0;

/// Confidence reported for byte-identical probe/template payloads.
pub const EXACT_MATCH_CONFIDENCE: f64 = 100.0;

pub const DEFAULT_COMPARE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the server re-checks comparator liveness in the background.
pub const LIVENESS_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Pause between the wake probe and the sequential retry pass.
pub const DEFAULT_WAKE_DELAY: Duration = Duration::from_millis(4_000);

/// Sequential matching unless configured otherwise.
pub const DEFAULT_MATCH_CONCURRENCY: usize = 1;

/// Upper bound on configured fan-out so a misconfiguration cannot flood the
/// remote comparison service.
pub const MAX_MATCH_CONCURRENCY: usize = 64;

/// Converts a descriptor distance into a confidence percentage.
///
/// `confidence = max(0, (1 - distance) * 100)`.
#[inline]
pub fn distance_to_confidence(distance: f64) -> f64 {
    ((1.0 - distance) * 100.0).max(0.0)
}

/// Rounds to one decimal place, the precision reported to callers.
#[inline]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
