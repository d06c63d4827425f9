use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use super::error::AuditError;
use super::record::AuditRecord;
use super::AuditSink;

const AUDIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
/// Posts each record as JSON to a fixed URL.
pub struct HttpAuditSink {
    http: HttpClient,
    url: String,
}

impl HttpAuditSink {
    pub fn new(url: impl Into<String>) -> Result<Self, AuditError> {
        let url = url.into();
        let http = HttpClient::builder()
            .timeout(AUDIT_TIMEOUT)
            .build()
            .map_err(|e| AuditError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuditSink for HttpAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&record)
            .send()
            .await
            .map_err(|e| AuditError::Transport {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AuditError::Status {
                status: resp.status().as_u16(),
            });
        }

        debug!(record_id = %record.record_id, "Audit record delivered");
        Ok(())
    }
}
