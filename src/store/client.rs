use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::StoreError;
use crate::biometric::{BiometricTemplate, Modality};

const STORE_TIMEOUT: Duration = Duration::from_secs(15);
const API_KEY_HEADER: &str = "X-Api-Key";
const ERROR_BODY_EXCERPT: usize = 256;

#[async_trait]
/// Read-only access to enrolled templates.
pub trait TemplateStore: Send + Sync {
    /// Lists templates of `modality` for active, non-deleted subjects, in the
    /// store's natural order. Rows that cannot be decoded are returned in
    /// [`TemplateListing::rejected`] instead of failing the listing.
    async fn fetch_templates(&self, modality: Modality) -> Result<TemplateListing, StoreError>;

    /// Cheap reachability probe.
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Document-query response body. Rows stay untyped until decoded one by one.
pub struct TemplateListResponse {
    #[serde(alias = "templates")]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
/// A stored row that could not be turned into a [`BiometricTemplate`].
pub struct RejectedTemplate {
    /// The row's `templateId`, or `#<position>` when it has none.
    pub template_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Result of one template listing.
pub struct TemplateListing {
    pub templates: Vec<BiometricTemplate>,
    pub rejected: Vec<RejectedTemplate>,
}

impl TemplateListing {
    pub fn new(templates: Vec<BiometricTemplate>) -> Self {
        Self {
            templates,
            rejected: Vec::new(),
        }
    }

    /// `true` when the store holds nothing at all for the modality.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.rejected.is_empty()
    }

    /// Decodes raw rows one at a time, skipping rows that name another modality.
    pub fn decode(rows: Vec<Value>, modality: Modality) -> Self {
        let mut listing = Self::default();
        for (position, row) in rows.into_iter().enumerate() {
            let row_modality = row
                .get("modality")
                .and_then(|m| Modality::deserialize(m).ok());
            if row_modality.is_some_and(|m| m != modality) {
                continue;
            }

            let template_id = row
                .get("templateId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", position));

            match serde_json::from_value::<BiometricTemplate>(row) {
                Ok(template) => listing.templates.push(template),
                Err(e) => listing.rejected.push(RejectedTemplate {
                    template_id,
                    reason: e.to_string(),
                }),
            }
        }
        listing
    }
}

#[derive(Clone)]
/// Template store backed by a hosted document-query API.
pub struct HttpTemplateStore {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpTemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTemplateStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpTemplateStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let http = HttpClient::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Unavailable {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn templates_url(&self) -> String {
        format!("{}/templates", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }
}

#[async_trait]
impl TemplateStore for HttpTemplateStore {
    async fn fetch_templates(&self, modality: Modality) -> Result<TemplateListing, StoreError> {
        let url = self.templates_url();
        let resp = self
            .request(self.http.get(&url))
            .query(&[("modality", modality.as_str()), ("activeOnly", "true")])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }

        let listing: TemplateListResponse =
            resp.json()
                .await
                .map_err(|e| StoreError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        let fetched = listing.documents.len();
        let decoded = TemplateListing::decode(listing.documents, modality);

        let dropped = fetched - decoded.templates.len() - decoded.rejected.len();
        if dropped > 0 {
            warn!(%modality, dropped, "Store returned templates of another modality");
        }
        for rejected in &decoded.rejected {
            warn!(
                %modality,
                template_id = %rejected.template_id,
                reason = %rejected.reason,
                "Skipping malformed stored template"
            );
        }

        debug!(
            %modality,
            count = decoded.templates.len(),
            rejected = decoded.rejected.len(),
            total = ?listing.total,
            "Fetched templates"
        );
        Ok(decoded)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .request(self.http.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(StoreError::Status {
                status: resp.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }
}
