use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unreachable at '{url}': {message}")]
    Transport { url: String, message: String },

    #[error("audit sink returned HTTP {status}")]
    Status { status: u16 },
}
