//! Hash-chain primitives: hashing, chain state, and integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the entry (serde_json, no pretty-printing)
//!
//! Entry details are a `BTreeMap`, so the JSON key order is stable across
//! processes and a chain read back from disk re-hashes identically.

use sha2::{Digest, Sha256};

use certa_contracts::{
    audit::{AuditLogEntry, AuditQuery},
    error::{CertError, CertResult},
};

use crate::event::LedgerEvent;

/// Compute the SHA-256 hash for one ledger event.
///
/// Returns a lowercase 64-character hex string, or `AuditWriteFailed` if the
/// entry cannot be serialized.
pub fn hash_event(sequence: u64, entry: &AuditLogEntry, prev_hash: &str) -> CertResult<String> {
    let entry_json = serde_json::to_vec(entry).map_err(|e| CertError::AuditWriteFailed {
        reason: format!("audit entry is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when, for every event in order:
///
/// 1. **Position**: `sequence` equals its index in the slice.
/// 2. **Prev-hash linkage**: `prev_hash` equals the preceding event's
///    `this_hash` (or `GENESIS_HASH` for the first event).
/// 3. **Hash correctness**: `this_hash` matches the value recomputed from
///    the event's own fields.
///
/// An empty chain is valid.
pub fn verify_chain(events: &[LedgerEvent]) -> bool {
    let mut expected_prev = LedgerEvent::GENESIS_HASH.to_string();

    for (index, event) in events.iter().enumerate() {
        if event.sequence != index as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(event.sequence, &event.entry, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}

// ── Chain state ──────────────────────────────────────────────────────────────

/// The mutable interior shared by every ledger backend.
#[derive(Debug)]
pub(crate) struct ChainState {
    pub(crate) events: Vec<LedgerEvent>,
    pub(crate) last_hash: String,
}

impl ChainState {
    pub(crate) fn new() -> Self {
        Self {
            events: Vec::new(),
            last_hash: LedgerEvent::GENESIS_HASH.to_string(),
        }
    }

    /// Adopt an already-verified chain.
    pub(crate) fn from_events(events: Vec<LedgerEvent>) -> Self {
        let last_hash = events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_else(|| LedgerEvent::GENESIS_HASH.to_string());
        Self { events, last_hash }
    }

    /// Build the next event for `entry` without committing it.
    ///
    /// The entry's id is overwritten with its chain position.
    pub(crate) fn seal(&self, mut entry: AuditLogEntry) -> CertResult<LedgerEvent> {
        let sequence = self.events.len() as u64;
        entry.id = sequence + 1;
        let this_hash = hash_event(sequence, &entry, &self.last_hash)?;
        Ok(LedgerEvent {
            sequence,
            entry,
            prev_hash: self.last_hash.clone(),
            this_hash,
        })
    }

    pub(crate) fn commit(&mut self, event: LedgerEvent) {
        self.last_hash = event.this_hash.clone();
        self.events.push(event);
    }

    /// Matching entries, newest first, truncated to the query limit.
    pub(crate) fn query(&self, query: &AuditQuery) -> Vec<AuditLogEntry> {
        let matching = self
            .events
            .iter()
            .rev()
            .map(|e| &e.entry)
            .filter(|entry| query.matches(entry))
            .cloned();
        match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
