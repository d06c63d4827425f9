//! Single-initialization guard for a comparator's underlying resource.
//!
//! Concurrent `ensure` calls run the initializer at most once; later callers
//! wait on the same lock and observe the ready state. A failed health check
//! calls [`ReadinessGate::invalidate`] so the next `ensure` reinitializes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::ComparatorError;

#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: AtomicBool,
    init_lock: Mutex<()>,
    initializations: AtomicUsize,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `init` unless the resource is already marked ready.
    pub async fn ensure<F, Fut>(&self, init: F) -> Result<(), ComparatorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ComparatorError>>,
    {
        // Acquire: pairs with the Release store below so a fast-path reader
        // sees everything the initializer did.
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        init().await?;

        self.initializations.fetch_add(1, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
        info!("Comparator resource initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Marks the resource stale; the next `ensure` reinitializes it.
    pub fn invalidate(&self) {
        if self.ready.swap(false, Ordering::AcqRel) {
            debug!("Comparator resource invalidated");
        }
    }

    /// Number of successful initializations so far.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::Relaxed)
    }
}
