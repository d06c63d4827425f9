use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
/// One pairwise comparison failed. Recoverable: the batch carries on.
pub enum ComparatorError {
    /// The call did not finish in time.
    #[error("comparison timed out after {after:?}")]
    Timeout {
        /// Configured limit.
        after: Duration,
    },

    /// Connection or I/O failure talking to the comparison service.
    #[error("comparison service unreachable at '{url}': {message}")]
    Transport {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The comparison service answered with a non-success status.
    #[error("comparison service returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The service answered with a body we could not interpret.
    #[error("invalid comparison response: {reason}")]
    InvalidResponse {
        /// Decoder message.
        reason: String,
    },

    /// The service processed the pair but reported a failure for it.
    #[error("comparison service reported: {reason}")]
    Remote {
        /// Service-provided reason.
        reason: String,
    },

    /// The stored template cannot be compared with the probe.
    #[error("malformed template: {reason}")]
    MalformedTemplate {
        /// What is wrong with it.
        reason: String,
    },

    /// The comparator's underlying resource is not ready.
    #[error("comparator not ready: {reason}")]
    NotReady {
        /// Why readiness failed.
        reason: String,
    },
}

impl ComparatorError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ComparatorError::Timeout { after: timeout }
        } else if err.is_decode() {
            ComparatorError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            ComparatorError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
