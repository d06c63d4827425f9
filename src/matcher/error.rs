use thiserror::Error;

use crate::biometric::ProbeError;

#[derive(Debug, Error)]
/// Fatal batch failures. Per-candidate comparator errors are never reported here.
pub enum MatchError {
    /// The probe could not be reduced to a comparable form.
    #[error("invalid probe: {0}")]
    ProbeInvalid(#[from] ProbeError),
}
