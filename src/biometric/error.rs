use thiserror::Error;

use super::model::Modality;

#[derive(Debug, Error, Clone, PartialEq)]
/// The captured sample could not be reduced to a comparable form.
pub enum ProbeError {
    /// Face capture produced no descriptor.
    #[error("no face detected in the captured sample")]
    NoFaceDetected,

    /// Fingerprint capture produced no image bytes.
    #[error("fingerprint image is empty")]
    EmptyImage,

    /// Descriptor length does not match the configured model dimension.
    #[error("invalid descriptor dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Descriptor contains NaN or infinite components.
    #[error("descriptor contains non-finite value at index {index}")]
    NonFiniteComponent {
        /// Offending component.
        index: usize,
    },

    /// Payload kind does not fit the declared modality.
    #[error("{modality} probe cannot carry a {payload_kind} payload")]
    ModalityMismatch {
        /// Declared modality.
        modality: Modality,
        /// Payload kind actually supplied.
        payload_kind: &'static str,
    },

    /// Payload could not be decoded (e.g. bad base64).
    #[error("undecodable sample: {reason}")]
    Undecodable {
        /// Decoder message.
        reason: String,
    },
}
