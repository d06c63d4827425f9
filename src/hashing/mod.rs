//! BLAKE3 digests of biometric payloads.
//!
//! Digests let audit records reference a probe without storing it, and give a
//! cheap pre-check before the byte-for-byte duplicate comparison.

use blake3::Hasher;

use crate::biometric::SamplePayload;

#[inline]
pub fn payload_digest(payload: &SamplePayload) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(payload.kind().as_bytes());
    hasher.update(b"|");
    hasher.update(&payload.to_bytes());
    *hasher.finalize().as_bytes()
}

/// Lowercase hex form of [`payload_digest`], used in logs and audit records.
pub fn payload_digest_hex(payload: &SamplePayload) -> String {
    blake3::Hash::from(payload_digest(payload)).to_hex().to_string()
}
