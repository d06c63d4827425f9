//! HTTP client helpers for tests.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use biomatch::{BIOMATCH_STATUS_HEADER, Verdict};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// A gateway answer: HTTP status, `X-Biomatch-Status` header and the verdict body.
#[derive(Debug)]
pub struct VerifyReply {
    pub status: u16,
    pub header: String,
    pub verdict: Verdict,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    async fn post_verify(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<VerifyReply, TestClientError> {
        let resp = self.client.post(self.url(path)).json(&body).send().await?;

        let status = resp.status().as_u16();
        let header = resp
            .headers()
            .get(BIOMATCH_STATUS_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        match status {
            200 | 422 | 503 => Ok(VerifyReply {
                status,
                header,
                verdict: resp.json().await?,
            }),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }

    pub async fn verify_fingerprint(
        &self,
        image: &[u8],
        session_id: Option<&str>,
    ) -> Result<VerifyReply, TestClientError> {
        let image = base64::engine::general_purpose::STANDARD.encode(image);
        self.post_verify(
            "/v1/verify/fingerprint",
            json!({ "image": image, "sessionId": session_id, "courseId": "CS101" }),
        )
        .await
    }

    pub async fn verify_face(
        &self,
        descriptor: Vec<f32>,
        session_id: Option<&str>,
    ) -> Result<VerifyReply, TestClientError> {
        self.post_verify(
            "/v1/verify/face",
            json!({ "descriptor": descriptor, "sessionId": session_id }),
        )
        .await
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/healthz")).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }

    /// Readiness body, returned for both 200 and 503.
    pub async fn ready(&self) -> Result<(u16, ReadyResponse), TestClientError> {
        let resp = self.client.get(self.url("/ready")).send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.json().await?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentStatus {
    pub http: String,
    pub store: String,
    pub face_comparator: String,
    pub fingerprint_comparator: String,
    pub face_transport: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub components: ComponentStatus,
}

impl ReadyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8080");
        assert_eq!(client.url("/healthz"), "http://localhost:8080/healthz");
        assert_eq!(client.url("healthz"), "http://localhost:8080/healthz");
    }
}
