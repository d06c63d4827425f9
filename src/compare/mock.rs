use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::PairComparator;
use super::error::ComparatorError;
use super::readiness::ReadinessGate;
use super::types::{ComparisonResult, RawComparison};
use crate::biometric::{BiometricTemplate, Modality, SamplePayload, Transport};
use crate::fallback::{BatchComparator, BatchOutcome};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(RawComparison),
    Fail(ComparatorError),
    Delay(Duration, RawComparison),
}

#[derive(Debug, Clone)]
/// How the mock answers `batch_compare`.
pub enum MockBatchMode {
    /// No batch endpoint; `as_batch` returns `None`.
    Unsupported,
    /// Scores every template from the script, like a healthy service.
    Healthy,
    /// Fails the whole batch call.
    Fail(ComparatorError),
    /// Fails the first `n` batch calls, then behaves as `Healthy`.
    FailTimes(usize, ComparatorError),
}

/// Scripted comparator keyed by template payload.
///
/// Unscripted payloads answer `matched: false, score: 0.0`.
pub struct MockComparator {
    modality: Modality,
    transport: Transport,
    script: Mutex<Vec<(SamplePayload, Scripted)>>,
    batch_mode: Mutex<MockBatchMode>,
    health: Mutex<Option<ComparatorError>>,
    gate: ReadinessGate,
    compare_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    wake_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockComparator {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            transport: Transport::Local,
            script: Mutex::new(Vec::new()),
            batch_mode: Mutex::new(MockBatchMode::Unsupported),
            health: Mutex::new(None),
            gate: ReadinessGate::new(),
            compare_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            wake_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A remote-style mock with a batch endpoint.
    pub fn remote(modality: Modality, batch_mode: MockBatchMode) -> Self {
        let mock = Self::new(modality);
        *mock.batch_mode.lock() = batch_mode;
        Self {
            transport: Transport::Remote,
            ..mock
        }
    }

    pub fn respond(self, payload: SamplePayload, raw: RawComparison) -> Self {
        self.script.lock().push((payload, Scripted::Respond(raw)));
        self
    }

    pub fn fail(self, payload: SamplePayload, error: ComparatorError) -> Self {
        self.script.lock().push((payload, Scripted::Fail(error)));
        self
    }

    pub fn delay(self, payload: SamplePayload, delay: Duration, raw: RawComparison) -> Self {
        self.script
            .lock()
            .push((payload, Scripted::Delay(delay, raw)));
        self
    }

    pub fn set_health(&self, error: Option<ComparatorError>) {
        *self.health.lock() = error;
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn wake_calls(&self) -> usize {
        self.wake_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn initializations(&self) -> usize {
        self.gate.initializations()
    }

    fn lookup(&self, payload: &SamplePayload) -> Scripted {
        self.script
            .lock()
            .iter()
            .find(|(p, _)| p.is_byte_identical(payload))
            .map(|(_, s)| s.clone())
            .unwrap_or(Scripted::Respond(RawComparison {
                matched: false,
                score: 0.0,
                confidence: 0.0,
                distance: None,
            }))
    }

    async fn score_one(&self, payload: &SamplePayload) -> Result<RawComparison, ComparatorError> {
        match self.lookup(payload) {
            Scripted::Respond(raw) => Ok(raw),
            Scripted::Fail(err) => Err(err),
            Scripted::Delay(delay, raw) => {
                tokio::time::sleep(delay).await;
                Ok(raw)
            }
        }
    }
}

#[async_trait]
impl PairComparator for MockComparator {
    fn modality(&self) -> Modality {
        self.modality
    }

    fn transport(&self) -> Transport {
        self.transport
    }

    async fn compare_payloads(
        &self,
        _probe: &SamplePayload,
        template: &SamplePayload,
    ) -> Result<RawComparison, ComparatorError> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.score_one(template).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn ensure_ready(&self) -> Result<(), ComparatorError> {
        let health = self.health.lock().clone();
        self.gate.ensure(|| async move { health.map_or(Ok(()), Err) }).await
    }

    async fn health_check(&self) -> Result<(), ComparatorError> {
        match self.health.lock().clone() {
            Some(err) => {
                self.gate.invalidate();
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    fn as_batch(&self) -> Option<&dyn BatchComparator> {
        match *self.batch_mode.lock() {
            MockBatchMode::Unsupported => None,
            _ => Some(self),
        }
    }
}

#[async_trait]
impl BatchComparator for MockComparator {
    async fn batch_compare(
        &self,
        _probe: &SamplePayload,
        templates: &[BiometricTemplate],
    ) -> Result<BatchOutcome, ComparatorError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let failure = {
            let mut mode = self.batch_mode.lock();
            match &mut *mode {
                MockBatchMode::Fail(err) => Some(err.clone()),
                MockBatchMode::FailTimes(remaining, err) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(err.clone())
                }
                _ => None,
            }
        };
        if let Some(err) = failure {
            return Err(err);
        }

        let mut results = Vec::with_capacity(templates.len());
        for template in templates {
            let result = match self.score_one(&template.payload).await {
                Ok(raw) => ComparisonResult::from_raw(template.template_id.clone(), raw),
                Err(err) => ComparisonResult::failed(template.template_id.clone(), err),
            };
            results.push(result);
        }

        Ok(BatchOutcome {
            total_compared: results.iter().filter(|r| !r.is_error()).count(),
            best_match: None,
            results,
        })
    }

    async fn wake(&self) -> Result<(), ComparatorError> {
        self.wake_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
