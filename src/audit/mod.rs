//! Fire-and-forget audit trail of verification outcomes.
//!
//! Records carry identifiers, scores and a probe digest. Raw biometric
//! payloads are never written.

pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod record;

#[cfg(test)]
mod tests;

pub use error::AuditError;
pub use http::HttpAuditSink;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockAuditSink;
pub use record::AuditRecord;

use async_trait::async_trait;

#[async_trait]
/// Destination for audit records, such as an attendance service.
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Discards every record.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}
