use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::context::VerifyContext;
use super::error::VerifyError;
use crate::audit::{AuditRecord, AuditSink};
use crate::biometric::{BiometricTemplate, Modality, ProbeError, ProbeSample};
use crate::compare::{ComparatorError, PairComparator};
use crate::decision::{DecisionPolicy, Verdict, decide};
use crate::fallback::{FallbackConfig, FallbackController};
use crate::matcher::{CancelSignal, CandidateError, MatchDecision, MatchOptions, find_best_match};
use crate::store::{RejectedTemplate, TemplateListing, TemplateStore};

/// Verifies probes of one modality against the enrolled templates.
///
/// Remote comparators with a batch endpoint go through the
/// [`FallbackController`]; everything else uses the matcher directly.
pub struct Verifier {
    store: Arc<dyn TemplateStore>,
    comparator: Arc<dyn PairComparator>,
    policy: DecisionPolicy,
    options: MatchOptions,
    fallback: FallbackController,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Verifier {
    pub fn new(store: Arc<dyn TemplateStore>, comparator: Arc<dyn PairComparator>) -> Self {
        let policy = DecisionPolicy::for_comparator(comparator.modality(), comparator.transport());
        Self {
            store,
            comparator,
            policy,
            options: MatchOptions::default(),
            fallback: FallbackController::default(),
            audit: None,
        }
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fallback(mut self, config: FallbackConfig) -> Self {
        self.fallback = FallbackController::new(config);
        self
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn modality(&self) -> Modality {
        self.comparator.modality()
    }

    pub fn comparator(&self) -> &Arc<dyn PairComparator> {
        &self.comparator
    }

    pub fn store(&self) -> &Arc<dyn TemplateStore> {
        &self.store
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Like [`Verifier::try_verify`], folding fatal errors into a failure verdict.
    pub async fn verify(&self, probe: &ProbeSample, context: &VerifyContext) -> Verdict {
        match self.try_verify(probe, context).await {
            Ok(verdict) => verdict,
            Err(e) => Verdict::failure(e.to_string()),
        }
    }

    pub async fn try_verify(
        &self,
        probe: &ProbeSample,
        context: &VerifyContext,
    ) -> Result<Verdict, VerifyError> {
        self.run(probe, context, &self.options).await
    }

    /// Verification that stops early, with a partial verdict, once `cancel` fires.
    pub async fn try_verify_until(
        &self,
        probe: &ProbeSample,
        context: &VerifyContext,
        cancel: CancelSignal,
    ) -> Result<Verdict, VerifyError> {
        let options = self.options.clone().with_cancel(cancel);
        self.run(probe, context, &options).await
    }

    #[instrument(skip_all, fields(modality = %probe.modality, session = ?context.session_id))]
    async fn run(
        &self,
        probe: &ProbeSample,
        context: &VerifyContext,
        options: &MatchOptions,
    ) -> Result<Verdict, VerifyError> {
        if probe.modality != self.modality() {
            return Err(ProbeError::ModalityMismatch {
                modality: self.modality(),
                payload_kind: probe.payload.kind(),
            }
            .into());
        }
        probe.validate(options.descriptor_dim)?;

        if let Err(e) = self.comparator.ensure_ready().await {
            warn!(error = %e, "Comparator not ready, continuing");
        }

        let TemplateListing {
            templates,
            rejected,
        } = self.store.fetch_templates(probe.modality).await?;
        let decision = self
            .match_templates(probe, &templates, options)
            .await?
            .with_unusable(rejected.into_iter().map(unusable_candidate).collect());
        let verdict = decide(&decision, &self.policy);

        info!(
            status = %verdict.status,
            compared = decision.candidates_compared,
            errors = decision.errors.len(),
            mode = decision.mode.as_str(),
            "Verification finished"
        );

        self.spawn_audit(context, &decision, &verdict);
        Ok(verdict)
    }

    async fn match_templates(
        &self,
        probe: &ProbeSample,
        templates: &[BiometricTemplate],
        options: &MatchOptions,
    ) -> Result<MatchDecision, VerifyError> {
        let comparator = self.comparator.as_ref();
        let decision = match comparator.as_batch() {
            Some(batch) => {
                self.fallback
                    .run(comparator, batch, probe, templates, options)
                    .await?
                    .decision
            }
            None => find_best_match(comparator, probe, templates, options).await?,
        };
        Ok(decision)
    }

    fn spawn_audit(&self, context: &VerifyContext, decision: &MatchDecision, verdict: &Verdict) {
        let Some(sink) = self.audit.as_ref().filter(|_| context.is_audited()) else {
            return;
        };
        let sink = Arc::clone(sink);
        let record = AuditRecord::new(context, decision, verdict);
        tokio::spawn(async move {
            let record_id = record.record_id;
            if let Err(e) = sink.record(record).await {
                warn!(%record_id, error = %e, "Failed to deliver audit record");
            }
        });
    }
}

fn unusable_candidate(rejected: RejectedTemplate) -> CandidateError {
    CandidateError {
        candidate_id: rejected.template_id,
        reason: ComparatorError::MalformedTemplate {
            reason: rejected.reason,
        }
        .to_string(),
    }
}
