use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::AuditError;
use super::record::AuditRecord;
use super::AuditSink;

/// Collects records in memory.
#[derive(Default)]
pub struct MockAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    fail: Mutex<bool>,
}

impl MockAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Polls until at least `count` records arrived or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<AuditRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let records = self.records();
            if records.len() >= count || tokio::time::Instant::now() >= deadline {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl AuditSink for MockAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        if *self.fail.lock() {
            return Err(AuditError::Status { status: 500 });
        }
        self.records.lock().push(record);
        Ok(())
    }
}
