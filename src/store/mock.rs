use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::client::{RejectedTemplate, TemplateListing, TemplateStore};
use super::error::StoreError;
use crate::biometric::{BiometricTemplate, Modality};

/// In-memory store for tests. Preserves insertion order.
#[derive(Default)]
pub struct MockTemplateStore {
    templates: RwLock<Vec<BiometricTemplate>>,
    rejected: RwLock<Vec<(Modality, RejectedTemplate)>>,
    unavailable: AtomicBool,
    fetch_count: AtomicUsize,
}

impl MockTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: Vec<BiometricTemplate>) -> Self {
        Self {
            templates: RwLock::new(templates),
            ..Self::default()
        }
    }

    /// Replaces any template with the same id, otherwise appends.
    pub fn enroll(&self, template: BiometricTemplate) {
        let mut templates = self.templates.write();
        match templates
            .iter_mut()
            .find(|t| t.template_id == template.template_id)
        {
            Some(existing) => *existing = template,
            None => templates.push(template),
        }
    }

    /// Adds a stored row of `modality` that fails to decode.
    pub fn add_malformed(&self, modality: Modality, template_id: &str, reason: &str) {
        self.rejected.write().push((
            modality,
            RejectedTemplate {
                template_id: template_id.to_string(),
                reason: reason.to_string(),
            },
        ));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateStore for MockTemplateStore {
    async fn fetch_templates(&self, modality: Modality) -> Result<TemplateListing, StoreError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.health_check().await?;

        Ok(TemplateListing {
            templates: self
                .templates
                .read()
                .iter()
                .filter(|t| t.modality == modality)
                .cloned()
                .collect(),
            rejected: self
                .rejected
                .read()
                .iter()
                .filter(|(m, _)| *m == modality)
                .map(|(_, r)| r.clone())
                .collect(),
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                url: "mock://templates".to_string(),
                message: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}
