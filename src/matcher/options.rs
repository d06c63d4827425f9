use std::time::Duration;

use tokio::sync::watch;

use crate::constants::{
    DEFAULT_COMPARE_TIMEOUT, DEFAULT_MATCH_CONCURRENCY, FACE_DESCRIPTOR_DIM, MAX_MATCH_CONCURRENCY,
};

/// Receiving side of a cancellation flag. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Sending side of a cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelSignal {
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
/// Knobs for one batch run.
pub struct MatchOptions {
    /// Comparisons in flight at once. Clamped to `1..=MAX_MATCH_CONCURRENCY`.
    pub concurrency: usize,
    /// Upper bound on a single pairwise call.
    pub call_timeout: Duration,
    /// Expected face descriptor length, used to validate the probe.
    pub descriptor_dim: usize,
    pub cancel: Option<CancelSignal>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_MATCH_CONCURRENCY,
            call_timeout: DEFAULT_COMPARE_TIMEOUT,
            descriptor_dim: FACE_DESCRIPTOR_DIM,
            cancel: None,
        }
    }
}

impl MatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_descriptor_dim(mut self, dim: usize) -> Self {
        self.descriptor_dim = dim;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_MATCH_CONCURRENCY)
    }
}
