//! Cooperative cancellation for long-running generate calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use certa_contracts::error::{CertError, CertResult};

/// A cloneable cancellation flag shared between a caller and an operation.
///
/// The orchestrator checks it before each persistence write; once set, the
/// operation stops without leaving a partially committed certificate.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled { stage })` if cancellation was requested.
    pub fn check(&self, stage: &'static str) -> CertResult<()> {
        if self.is_cancelled() {
            Err(CertError::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}
