//! # certa-audit
//!
//! Append-only, SHA-256 hash-chained audit ledgers for certificate
//! lifecycle events.
//!
//! ## Overview
//!
//! Every `AuditLogEntry` the audit service records is wrapped in a
//! `LedgerEvent` that links to the previous event via its SHA-256 hash.
//! Tampering with any event, even a single byte, breaks the chain and is
//! detected by `verify_chain`.
//!
//! Two backends implement `AuditLedger`:
//! - [`InMemoryAuditLedger`] for tests and single-process deployments
//! - [`JsonlAuditLedger`], a JSON Lines file verified on every open
//!
//! ## Usage
//!
//! ```rust,ignore
//! use certa_audit::InMemoryAuditLedger;
//! use certa_core::traits::AuditLedger;
//!
//! let ledger = InMemoryAuditLedger::new();
//! ledger.append(entry)?;
//!
//! assert!(ledger.verify_integrity());
//! let export = ledger.export()?;
//! ```

pub mod chain;
pub mod event;
pub mod jsonl;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{LedgerEvent, LedgerExport};
pub use jsonl::JsonlAuditLedger;
pub use memory::InMemoryAuditLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Barrier};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use certa_contracts::{
        audit::{AuditAction, AuditLogEntry, AuditQuery},
        certificate::{CertificateId, OwnerId},
        error::CertError,
    };
    use certa_core::{clock::FixedClock, traits::AuditLedger};

    use super::{verify_chain, InMemoryAuditLedger, JsonlAuditLedger, LedgerEvent};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    /// Build an entry with a distinguishable owner and detail.
    fn make_entry(minutes: i64, owner: &str) -> AuditLogEntry {
        AuditLogEntry::new(AuditAction::Generation, at(minutes))
            .owner(Some(&OwnerId::new(owner)))
            .certificate(Some(CertificateId(minutes as u64 + 1)))
            .detail("certificate_type", "attendance")
            .detail("attendance_percent", 87.5)
    }

    fn filled(n: i64) -> InMemoryAuditLedger {
        let ledger = InMemoryAuditLedger::new();
        for i in 0..n {
            ledger.append(make_entry(i, "u1")).unwrap();
        }
        ledger
    }

    // ── In-memory chain ───────────────────────────────────────────────────────

    /// Appending three entries and verifying produces a valid chain.
    #[test]
    fn test_hash_chain_integrity() {
        let ledger = filled(3);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.verify_integrity(), "chain must be valid after sequential appends");
    }

    /// Mutating any stored entry breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let ledger = filled(3);

        {
            let mut state = ledger.state.lock().unwrap();
            state.events[0].entry.success = false;
        }

        assert!(
            !ledger.verify_integrity(),
            "chain must detect tampering with a stored entry"
        );
    }

    /// Dropping an event from the middle is detected as a linkage break.
    #[test]
    fn test_deletion_detection() {
        let ledger = filled(3);
        let mut events = ledger.events().unwrap();
        events.remove(1);
        assert!(!verify_chain(&events));
    }

    #[test]
    fn test_genesis_and_ids() {
        let ledger = InMemoryAuditLedger::new();
        let stored = ledger.append(make_entry(0, "u1")).unwrap();
        let second = ledger.append(make_entry(1, "u1")).unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(second.id, 2);

        let export = ledger.export().unwrap();
        assert_eq!(export.events[0].prev_hash, LedgerEvent::GENESIS_HASH);
        assert_eq!(export.events[1].prev_hash, export.events[0].this_hash);
        assert_eq!(export.terminal_hash, export.events[1].this_hash);
    }

    #[test]
    fn test_verify_empty() {
        let ledger = InMemoryAuditLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.verify_integrity(), "an empty chain must be considered valid");
        assert_eq!(ledger.export().unwrap().terminal_hash, "");
    }

    #[test]
    fn test_export_is_stamped_by_ledger_clock() {
        let ledger = InMemoryAuditLedger::with_clock(Arc::new(FixedClock::new(at(90))));
        ledger.append(make_entry(0, "u1")).unwrap();
        assert_eq!(ledger.export().unwrap().exported_at, at(90));
    }

    /// Concurrent appends still produce a dense, verifiable chain.
    #[test]
    fn test_concurrent_appends() {
        let ledger = Arc::new(InMemoryAuditLedger::new());
        let threads = 8;
        let per_thread = 25;
        let barrier = Barrier::new(threads);

        std::thread::scope(|s| {
            for t in 0..threads {
                let ledger = &ledger;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        ledger
                            .append(make_entry(i, &format!("u{t}")))
                            .unwrap();
                    }
                });
            }
        });

        let events = ledger.events().unwrap();
        assert_eq!(events.len(), threads * per_thread as usize);
        assert!(verify_chain(&events));
        for (idx, event) in events.iter().enumerate() {
            assert_eq!(event.entry.id, idx as u64 + 1);
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    #[test]
    fn test_query_newest_first_with_filters() {
        let ledger = InMemoryAuditLedger::new();
        for i in 0..4 {
            ledger.append(make_entry(i, "u1")).unwrap();
        }
        ledger.append(make_entry(10, "u2")).unwrap();

        let u1 = ledger
            .query(&AuditQuery {
                owner_id: Some(OwnerId::new("u1")),
                limit: Some(3),
                ..AuditQuery::default()
            })
            .unwrap();
        assert_eq!(u1.len(), 3);
        assert_eq!(u1[0].timestamp, at(3));
        assert!(u1.windows(2).all(|w| w[0].id > w[1].id));

        let window = ledger
            .query(&AuditQuery {
                since: Some(at(1)),
                until: Some(at(2)),
                ..AuditQuery::default()
            })
            .unwrap();
        assert_eq!(window.len(), 2);

        let by_cert = ledger
            .query(&AuditQuery {
                certificate_id: Some(CertificateId(11)),
                ..AuditQuery::default()
            })
            .unwrap();
        assert_eq!(by_cert.len(), 1);
        assert_eq!(by_cert[0].owner_id, Some(OwnerId::new("u2")));
    }

    // ── JSON Lines ledger ─────────────────────────────────────────────────────

    #[test]
    fn test_jsonl_reopen_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let ledger = JsonlAuditLedger::open(&path).unwrap();
            ledger.append(make_entry(0, "u1")).unwrap();
            ledger
                .append(make_entry(1, "u1").detail("note", json!({ "nested": [1, 2, 3] })))
                .unwrap();
        }

        let reopened = JsonlAuditLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let third = reopened.append(make_entry(2, "u1")).unwrap();
        assert_eq!(third.id, 3);
        assert!(reopened.verify_integrity());

        let latest = reopened.query(&AuditQuery::default()).unwrap();
        assert_eq!(latest[0].id, 3);
        assert_eq!(latest[1].details["note"]["nested"][2], 3);

        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 3);
    }

    #[test]
    fn test_jsonl_refuses_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlAuditLedger::open(&path).unwrap();
            ledger.append(make_entry(0, "u1")).unwrap();
            ledger.append(make_entry(1, "u1")).unwrap();
        }

        let original = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, original.replacen("u1", "u9", 1)).unwrap();

        match JsonlAuditLedger::open(&path) {
            Err(CertError::AuditWriteFailed { reason }) => {
                assert!(reason.contains("integrity"), "unexpected reason: {reason}")
            }
            Err(other) => panic!("expected AuditWriteFailed, got {:?}", other),
            Ok(_) => panic!("tampered ledger must not open"),
        }
    }

    #[test]
    fn test_jsonl_export_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let clock = Arc::new(FixedClock::new(at(30)));

        let ledger = JsonlAuditLedger::open_with_clock(&path, clock.clone()).unwrap();
        assert_eq!(ledger.export().unwrap().terminal_hash, "");
        ledger.append(make_entry(0, "u1")).unwrap();
        ledger.append(make_entry(1, "u2")).unwrap();

        let export = ledger.export().unwrap();
        assert_eq!(export.exported_at, at(30));
        assert_eq!(export.events.len(), 2);
        assert_eq!(export.terminal_hash, export.events[1].this_hash);
        assert!(verify_chain(&export.events));
        drop(ledger);

        let reopened = JsonlAuditLedger::open_with_clock(&path, clock).unwrap();
        assert_eq!(reopened.export().unwrap().terminal_hash, export.terminal_hash);
    }

    /// A crash mid-append leaves a partial last line; reopening drops it.
    #[test]
    fn test_jsonl_recovers_from_partial_trailing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlAuditLedger::open(&path).unwrap();
            ledger.append(make_entry(0, "u1")).unwrap();
            ledger.append(make_entry(1, "u1")).unwrap();
        }
        let intact = std::fs::read_to_string(&path).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"sequence\":2,\"entr").unwrap();
        drop(file);

        let reopened = JsonlAuditLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.verify_integrity());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), intact);

        let third = reopened.append(make_entry(2, "u1")).unwrap();
        assert_eq!(third.id, 3);
        drop(reopened);

        let again = JsonlAuditLedger::open(&path).unwrap();
        assert_eq!(again.len(), 3);
        assert!(again.verify_integrity());
    }

    #[test]
    fn test_jsonl_terminates_last_record_missing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlAuditLedger::open(&path).unwrap();
            ledger.append(make_entry(0, "u1")).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.trim_end()).unwrap();

        let reopened = JsonlAuditLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        reopened.append(make_entry(1, "u1")).unwrap();
        drop(reopened);

        let again = JsonlAuditLedger::open(&path).unwrap();
        assert_eq!(again.len(), 2);
        assert!(again.verify_integrity());
    }

    /// Only the final line may be partial; damage elsewhere is corruption.
    #[test]
    fn test_jsonl_rejects_partial_record_before_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlAuditLedger::open(&path).unwrap();
            ledger.append(make_entry(0, "u1")).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, format!("{{\"sequence\":0,\"entr\n{contents}")).unwrap();

        match JsonlAuditLedger::open(&path) {
            Err(CertError::AuditWriteFailed { reason }) => assert!(reason.contains("line 1")),
            Err(other) => panic!("expected AuditWriteFailed, got {:?}", other),
            Ok(_) => panic!("a damaged interior line must not be skipped"),
        }
    }

    #[test]
    fn test_jsonl_rejects_garbage_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "not json").unwrap();
        drop(file);

        let err = JsonlAuditLedger::open(&path).err().unwrap();
        match err {
            CertError::AuditWriteFailed { reason } => assert!(reason.contains("line 1")),
            other => panic!("expected AuditWriteFailed, got {:?}", other),
        }
    }
}
