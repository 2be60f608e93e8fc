//! Append-only JSON Lines ledger.
//!
//! One `LedgerEvent` per line. Opening an existing file replays and verifies
//! the whole chain; a file that fails verification is refused rather than
//! extended. Each append is written and flushed before it becomes visible
//! to readers. A failed write truncates the file back to its previous
//! length, so the in-memory chain and the file stay in step.
//!
//! A crash mid-append can still leave an unterminated fragment as the last
//! line. Opening such a file drops the fragment with a warning and truncates
//! it away; an unparsable line anywhere else is refused as corruption.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

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
    event::{LedgerEvent, LedgerExport},
};

struct JsonlState {
    chain: ChainState,
    file: File,
}

/// A durable audit ledger stored as a JSON Lines file.
pub struct JsonlAuditLedger {
    path: PathBuf,
    state: Mutex<JsonlState>,
    clock: Arc<dyn Clock>,
}

/// How the last line of a replayed file ended.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    Clean,
    /// The last event parsed but has no trailing newline.
    Unterminated,
    /// The last line is a partial record starting at this byte offset.
    Torn(u64),
}

impl JsonlAuditLedger {
    /// Open (or create) the ledger at `path`, verifying any existing chain.
    /// Exports are stamped with wall-clock time.
    ///
    /// # Errors
    ///
    /// `AuditWriteFailed` if the file cannot be opened, a complete line
    /// cannot be parsed, or the recorded chain does not verify.
    pub fn open(path: impl AsRef<Path>) -> CertResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// `open`, stamping exports with `clock`.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> CertResult<Self> {
        let path = path.as_ref().to_path_buf();
        let (events, tail) = if path.exists() {
            read_events(&path)?
        } else {
            (Vec::new(), Tail::Clean)
        };

        if !verify_chain(&events) {
            warn!(path = %path.display(), "audit ledger failed integrity verification");
            return Err(CertError::AuditWriteFailed {
                reason: format!(
                    "audit ledger '{}' failed integrity verification",
                    path.display()
                ),
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CertError::AuditWriteFailed {
                reason: format!("failed to open audit ledger '{}': {}", path.display(), e),
            })?;

        let repaired = match tail {
            Tail::Clean => Ok(()),
            Tail::Unterminated => file.write_all(b"\n"),
            Tail::Torn(offset) => file.set_len(offset),
        };
        repaired.map_err(|e| CertError::AuditWriteFailed {
            reason: format!("failed to repair audit ledger '{}': {}", path.display(), e),
        })?;

        info!(path = %path.display(), events = events.len(), "audit ledger opened");

        Ok(Self {
            path,
            state: Mutex::new(JsonlState {
                chain: ChainState::from_events(events),
                file,
            }),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> CertResult<MutexGuard<'_, JsonlState>> {
        self.state.lock().map_err(|e| CertError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.chain.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every event in chain order.
    pub fn events(&self) -> CertResult<Vec<LedgerEvent>> {
        Ok(self.lock()?.chain.events.clone())
    }

    /// Export a sealed snapshot of the chain.
    pub fn export(&self) -> CertResult<LedgerExport> {
        let events = self.events()?;
        Ok(LedgerExport::new(events, self.clock.now()))
    }

    /// Re-verify the chain held in memory.
    pub fn verify_integrity(&self) -> bool {
        self.lock()
            .map(|s| verify_chain(&s.chain.events))
            .unwrap_or(false)
    }
}

fn read_events(path: &Path) -> CertResult<(Vec<LedgerEvent>, Tail)> {
    let bytes = std::fs::read(path).map_err(|e| CertError::AuditWriteFailed {
        reason: format!("failed to read audit ledger '{}': {}", path.display(), e),
    })?;

    let mut events = Vec::new();
    let mut tail = Tail::Clean;
    let mut offset = 0;
    let mut line_number = 0;
    while offset < bytes.len() {
        line_number += 1;
        let rest = &bytes[offset..];
        let (line, terminated) = match rest.iter().position(|b| *b == b'\n') {
            Some(end) => (&rest[..end], true),
            None => (rest, false),
        };
        let next = offset + line.len() + usize::from(terminated);

        if line.iter().all(u8::is_ascii_whitespace) {
            offset = next;
            continue;
        }
        match serde_json::from_slice::<LedgerEvent>(line) {
            Ok(event) => {
                events.push(event);
                tail = if terminated { Tail::Clean } else { Tail::Unterminated };
            }
            Err(e) if !terminated => {
                warn!(
                    path = %path.display(),
                    line = line_number,
                    error = %e,
                    "discarding partial trailing audit record"
                );
                tail = Tail::Torn(offset as u64);
            }
            Err(e) => {
                return Err(CertError::AuditWriteFailed {
                    reason: format!(
                        "audit ledger '{}' line {} is not a ledger event: {}",
                        path.display(),
                        line_number,
                        e
                    ),
                })
            }
        }
        offset = next;
    }
    Ok((events, tail))
}

impl AuditLedger for JsonlAuditLedger {
    fn append(&self, entry: AuditLogEntry) -> CertResult<AuditLogEntry> {
        let mut state = self.lock()?;
        let event = state.chain.seal(entry)?;

        let mut line = serde_json::to_vec(&event).map_err(|e| CertError::AuditWriteFailed {
            reason: format!("audit event is not serializable: {}", e),
        })?;
        line.push(b'\n');

        let file = &mut state.file;
        let committed_len = file.metadata().map(|m| m.len()).map_err(|e| {
            CertError::AuditWriteFailed {
                reason: format!("failed to stat audit ledger '{}': {}", self.path.display(), e),
            }
        })?;
        if let Err(e) = file.write_all(&line).and_then(|_| file.flush()) {
            if let Err(rollback) = file.set_len(committed_len) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to truncate partial audit record"
                );
            }
            return Err(CertError::AuditWriteFailed {
                reason: format!("failed to write audit ledger '{}': {}", self.path.display(), e),
            });
        }

        debug!(sequence = event.sequence, hash = %event.this_hash, "audit event persisted");
        let stored = event.entry.clone();
        state.chain.commit(event);
        Ok(stored)
    }

    fn query(&self, query: &AuditQuery) -> CertResult<Vec<AuditLogEntry>> {
        Ok(self.lock()?.chain.query(query))
    }
}
