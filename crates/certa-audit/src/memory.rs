//! In-memory implementation of `AuditLedger`.
//!
//! `InMemoryAuditLedger` keeps the chain in a `Vec` behind a `Mutex`, so any
//! number of orchestrator threads may append concurrently. Appends are
//! serialized; sequence numbers are dense and never reused.
//!
//! Use `export()` to obtain a sealed `LedgerExport`, and `verify_integrity()`
//! at any time to confirm the chain has not been tampered with in memory.
//! Exports are stamped by the ledger's clock: wall-clock time unless one is
//! supplied through `with_clock`.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use certa_contracts::{
    audit::{AuditLogEntry, AuditQuery},
    error::{CertError, CertResult},
};
use certa_core::{
    clock::SystemClock,
    traits::{AuditLedger, Clock},
};

use crate::{
    chain::{verify_chain, ChainState},
    event::{LedgerExport, LedgerEvent},
};

/// An in-memory, append-only audit ledger backed by a SHA-256 hash chain.
pub struct InMemoryAuditLedger {
    pub(crate) state: Mutex<ChainState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryAuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A ledger whose exports are stamped by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ChainState::new()),
            clock,
        }
    }

    fn lock(&self) -> CertResult<MutexGuard<'_, ChainState>> {
        self.state.lock().map_err(|e| CertError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every event in chain order.
    pub fn events(&self) -> CertResult<Vec<LedgerEvent>> {
        Ok(self.lock()?.events.clone())
    }

    /// Export a sealed snapshot of the chain.
    pub fn export(&self) -> CertResult<LedgerExport> {
        let events = self.lock()?.events.clone();
        Ok(LedgerExport::new(events, self.clock.now()))
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        match self.lock() {
            Ok(state) => {
                let intact = verify_chain(&state.events);
                if !intact {
                    error!(events = state.events.len(), "audit chain integrity check failed");
                }
                intact
            }
            Err(_) => false,
        }
    }
}

impl AuditLedger for InMemoryAuditLedger {
    fn append(&self, entry: AuditLogEntry) -> CertResult<AuditLogEntry> {
        let mut state = self.lock()?;
        let event = state.seal(entry)?;
        let stored = event.entry.clone();
        debug!(sequence = event.sequence, hash = %event.this_hash, "audit event chained");
        state.commit(event);
        Ok(stored)
    }

    fn query(&self, query: &AuditQuery) -> CertResult<Vec<AuditLogEntry>> {
        Ok(self.lock()?.query(query))
    }
}
