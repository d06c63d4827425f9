use thiserror::Error;

use crate::biometric::ProbeError;
use crate::matcher::MatchError;
use crate::store::StoreError;

#[derive(Debug, Error)]
/// Failures that prevent any decision from being made.
pub enum VerifyError {
    #[error("invalid probe: {0}")]
    ProbeInvalid(#[from] ProbeError),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl From<MatchError> for VerifyError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::ProbeInvalid(e) => VerifyError::ProbeInvalid(e),
        }
    }
}
