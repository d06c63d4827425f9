use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by template store operations.
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("template store unavailable at '{url}': {message}")]
    Unavailable {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The store answered with a non-success status.
    #[error("template store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The listing could not be decoded.
    #[error("invalid template listing: {reason}")]
    InvalidResponse {
        /// Decoder message.
        reason: String,
    },
}
