//! Ledger event and export types.
//!
//! `LedgerEvent` is a single entry in the hash chain. It wraps an
//! `AuditLogEntry` with sequence numbering and the SHA-256 hashes that make
//! tampering detectable. `LedgerExport` is a sealed snapshot of the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certa_contracts::audit::AuditLogEntry;

/// A single entry in the SHA-256 hash chain.
///
/// Each event commits to the previous event via `prev_hash`, forming an
/// append-only chain. Modifying any field, including those of the embedded
/// `entry`, invalidates `this_hash` and every subsequent `prev_hash`, which
/// `verify_chain` detects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the chain, starting at 0. The entry id is `sequence + 1`.
    pub sequence: u64,

    pub entry: AuditLogEntry,

    /// SHA-256 hash (hex) of the previous event, or `GENESIS_HASH` for the
    /// first event.
    pub prev_hash: String,

    /// SHA-256 hash (hex) over (sequence, prev_hash, canonical JSON of entry).
    pub this_hash: String,
}

impl LedgerEvent {
    /// The sentinel `prev_hash` of the first event in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of the whole ledger.
///
/// `terminal_hash` is the `this_hash` of the last event and commits to the
/// entire history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub events: Vec<LedgerEvent>,
    pub exported_at: DateTime<Utc>,
    /// Empty string if the ledger is empty.
    pub terminal_hash: String,
}

impl LedgerExport {
    pub fn new(events: Vec<LedgerEvent>, exported_at: DateTime<Utc>) -> Self {
        let terminal_hash = events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();
        Self {
            events,
            exported_at,
            terminal_hash,
        }
    }
}
