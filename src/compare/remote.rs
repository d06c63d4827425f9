//! HTTP client for a hosted face/fingerprint comparison service.
//!
//! Endpoints: `POST /compare`, `POST /batch-compare`, `GET /health`.
//! Fingerprint images travel base64-encoded; descriptors as JSON arrays.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PairComparator;
use super::error::ComparatorError;
use super::readiness::ReadinessGate;
use super::types::{ComparisonResult, RawComparison};
use crate::biometric::{BiometricTemplate, Modality, SamplePayload, Transport};
use crate::constants::{
    DEFAULT_BATCH_TIMEOUT, DEFAULT_COMPARE_TIMEOUT, DEFAULT_HEALTH_TIMEOUT, distance_to_confidence,
};
use crate::fallback::{BatchComparator, BatchOutcome};

const ERROR_BODY_EXCERPT: usize = 256;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub modality: Modality,
    pub sample_a: SamplePayload,
    pub sample_b: SamplePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub matched: bool,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl CompareResponse {
    fn into_raw(self) -> RawComparison {
        let confidence = self
            .confidence
            .or_else(|| self.distance.map(distance_to_confidence))
            .unwrap_or(self.score);
        RawComparison {
            matched: self.matched,
            score: self.score,
            confidence,
            distance: self.distance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTemplate {
    pub id: String,
    pub payload: SamplePayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompareRequest {
    pub modality: Modality,
    pub probe: SamplePayload,
    pub templates: Vec<BatchTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One candidate in a batch response. `error` marks a per-candidate failure.
pub struct BatchCandidate {
    pub id: String,
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchCandidate {
    fn into_result(self) -> ComparisonResult {
        match self.error {
            Some(reason) => ComparisonResult::failed(self.id, ComparatorError::Remote { reason }),
            None => {
                let raw = CompareResponse {
                    matched: self.matched,
                    score: self.score,
                    confidence: self.confidence,
                    distance: self.distance,
                }
                .into_raw();
                ComparisonResult::from_raw(self.id, raw)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompareResponse {
    #[serde(default)]
    pub best_match: Option<BatchCandidate>,
    pub total_compared: usize,
    #[serde(default)]
    pub results: Vec<BatchCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ready: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteComparatorConfig {
    pub base_url: String,
    pub modality: Modality,
    pub compare_timeout: Duration,
    pub batch_timeout: Duration,
    pub health_timeout: Duration,
}

impl RemoteComparatorConfig {
    pub fn new(base_url: impl Into<String>, modality: Modality) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            modality,
            compare_timeout: DEFAULT_COMPARE_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, compare: Duration, batch: Duration) -> Self {
        self.compare_timeout = compare;
        self.batch_timeout = batch;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Comparator that delegates every pair (or a whole batch) to a remote service.
pub struct RemoteComparator {
    http: HttpClient,
    config: RemoteComparatorConfig,
    gate: ReadinessGate,
}

impl std::fmt::Debug for RemoteComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteComparator")
            .field("config", &self.config)
            .field("ready", &self.gate.is_ready())
            .finish()
    }
}

impl RemoteComparator {
    pub fn new(config: RemoteComparatorConfig) -> Result<Self, ComparatorError> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ComparatorError::Transport {
                url: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            config,
            gate: ReadinessGate::new(),
        })
    }

    pub fn config(&self) -> &RemoteComparatorConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn post_json<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, ComparatorError>
    where
        Req: Serialize + ?Sized,
        Resp: serde::de::DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ComparatorError::from_reqwest(&url, e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ComparatorError::Status {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| ComparatorError::from_reqwest(&url, e, timeout))
    }

    async fn probe_health(&self) -> Result<(), ComparatorError> {
        let url = self.url("health");
        let timeout = self.config.health_timeout;
        let resp = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ComparatorError::from_reqwest(&url, e, timeout))?;

        if !resp.status().is_success() {
            return Err(ComparatorError::Status {
                status: resp.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }

        let health: HealthResponse = resp
            .json()
            .await
            .map_err(|e| ComparatorError::from_reqwest(&url, e, timeout))?;

        if health.ready {
            Ok(())
        } else {
            Err(ComparatorError::NotReady {
                reason: "service reports ready=false".to_string(),
            })
        }
    }
}

#[async_trait]
impl PairComparator for RemoteComparator {
    fn modality(&self) -> Modality {
        self.config.modality
    }

    fn transport(&self) -> Transport {
        Transport::Remote
    }

    async fn compare_payloads(
        &self,
        probe: &SamplePayload,
        template: &SamplePayload,
    ) -> Result<RawComparison, ComparatorError> {
        let request = CompareRequest {
            modality: self.config.modality,
            sample_a: probe.clone(),
            sample_b: template.clone(),
        };
        let response: CompareResponse = self
            .post_json("compare", &request, self.config.compare_timeout)
            .await?;
        Ok(response.into_raw())
    }

    async fn ensure_ready(&self) -> Result<(), ComparatorError> {
        self.gate.ensure(|| self.probe_health()).await
    }

    async fn health_check(&self) -> Result<(), ComparatorError> {
        let result = self.probe_health().await;
        if result.is_err() {
            self.gate.invalidate();
        }
        result
    }

    fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    fn as_batch(&self) -> Option<&dyn BatchComparator> {
        Some(self)
    }
}

#[async_trait]
impl BatchComparator for RemoteComparator {
    async fn batch_compare(
        &self,
        probe: &SamplePayload,
        templates: &[BiometricTemplate],
    ) -> Result<BatchOutcome, ComparatorError> {
        let request = BatchCompareRequest {
            modality: self.config.modality,
            probe: probe.clone(),
            templates: templates
                .iter()
                .map(|t| BatchTemplate {
                    id: t.template_id.clone(),
                    payload: t.payload.clone(),
                })
                .collect(),
        };

        let response: BatchCompareResponse = self
            .post_json("batch-compare", &request, self.config.batch_timeout)
            .await?;

        debug!(
            total_compared = response.total_compared,
            results = response.results.len(),
            has_best = response.best_match.is_some(),
            "Batch comparison finished"
        );

        Ok(BatchOutcome {
            results: response
                .results
                .into_iter()
                .map(BatchCandidate::into_result)
                .collect(),
            best_match: response.best_match.map(BatchCandidate::into_result),
            total_compared: response.total_compared,
        })
    }

    async fn wake(&self) -> Result<(), ComparatorError> {
        let result = self.probe_health().await;
        if let Err(ref e) = result {
            warn!(error = %e, "Wake probe did not succeed");
            self.gate.invalidate();
        }
        result
    }
}
