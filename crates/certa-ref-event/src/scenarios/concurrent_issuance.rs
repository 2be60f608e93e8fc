//! Scenario 2: Concurrent Issuance
//!
//! The registration desk is flooded with retries for the same request:
//!
//! Part A: eight threads issue an attendance certificate for (U2, A2) at
//!         once → exactly one succeeds, the rest get DuplicateCertificate
//! Part B: U4 attended only 40% of A2 → Ineligible, with the failed check
//! Part C: four admins revoke the issued certificate at once → exactly one
//!         succeeds, the rest see "already revoked"
//!
//! The guarantees come from the repository's atomic insert and
//! compare-and-set status update, not from any locking in the orchestrator.

use std::thread;

use certa_contracts::{
    certificate::{
        ActivityId, Certificate, CertificateStatus, CertificateType, EnrollmentId, OwnerId,
    },
    error::{CertError, CertResult},
    request::{GenerateRequest, ListRequest, RevokeRequest},
};

use crate::runtime::EventRuntime;

use super::{ensure, print_integrity};

const ISSUING_THREADS: usize = 8;
const REVOKING_THREADS: usize = 4;

pub fn run_scenario() -> CertResult<()> {
    println!("=== Scenario 2: Concurrent Issuance ===");
    println!();

    let (runtime, ledger) = EventRuntime::with_memory_ledger()?;
    let staff = runtime.actor("S1")?;
    let admin = runtime.actor("ADMIN")?;

    // ── Part A: racing issuance ──────────────────────────────────────────────
    println!(
        "  [A] {} threads issue an attendance certificate for U2 in session A2",
        ISSUING_THREADS
    );
    let request = GenerateRequest::new(OwnerId::new("U2"), CertificateType::Attendance)
        .with_activity(ActivityId::new("A2"))
        .with_enrollment(EnrollmentId::new("E-U2-A2"));

    let outcomes: Vec<CertResult<Certificate>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..ISSUING_THREADS)
            .map(|_| {
                let request = request.clone();
                let runtime = &runtime;
                let staff = &staff;
                scope.spawn(move || runtime.generate_as(staff, request).and_then(|g| g.allowed()))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(CertError::Internal {
                        reason: "issuing thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let mut issued = Vec::new();
    let mut duplicates = 0;
    for outcome in outcomes {
        match outcome {
            Ok(certificate) => issued.push(certificate),
            Err(CertError::DuplicateCertificate { .. }) => duplicates += 1,
            Err(other) => return Err(other),
        }
    }
    println!("      Issued: {}   Duplicate: {}", issued.len(), duplicates);
    ensure(issued.len() == 1, "exactly one concurrent issuance wins")?;
    ensure(
        duplicates == ISSUING_THREADS - 1,
        "every other issuance reports a duplicate",
    )?;
    let winner = issued.remove(0);
    println!(
        "      Winner: certificate #{} ({} artifact(s) in storage)",
        winner.id,
        runtime.storage.len()
    );
    ensure(runtime.storage.len() == 1, "losing attempts leave no artifacts")?;

    // ── Part B: ineligible owner ─────────────────────────────────────────────
    println!("  [B] U4 requests an attendance certificate for session A2");
    let low_attendance = GenerateRequest::new(OwnerId::new("U4"), CertificateType::Attendance)
        .with_activity(ActivityId::new("A2"));
    match runtime.generate_as(&staff, low_attendance) {
        Err(err @ CertError::Ineligible { .. }) => {
            println!("      Rejected: {}", err.public_message());
        }
        other => {
            return Err(CertError::Internal {
                reason: format!("expected Ineligible, got {:?}", other),
            })
        }
    }

    // ── Part C: racing revocation ────────────────────────────────────────────
    println!(
        "  [C] {} admins revoke certificate #{} at once",
        REVOKING_THREADS, winner.id
    );
    let revoke = RevokeRequest {
        certificate_id: winner.id,
        reason: "issued in error".to_string(),
    };
    let revocations: Vec<CertResult<Certificate>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..REVOKING_THREADS)
            .map(|_| {
                let (runtime, admin, revoke) = (&runtime, &admin, &revoke);
                scope.spawn(move || runtime.revoke_as(admin, revoke).and_then(|g| g.allowed()))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(CertError::Internal {
                        reason: "revoking thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let mut revoked = 0;
    let mut rejected = 0;
    for outcome in revocations {
        match outcome {
            Ok(_) => revoked += 1,
            Err(CertError::InvalidTransition { .. }) => rejected += 1,
            Err(other) => return Err(other),
        }
    }
    println!("      Revoked: {}   Already revoked: {}", revoked, rejected);
    ensure(revoked == 1, "exactly one concurrent revocation wins")?;

    let page = runtime.service.list(&ListRequest {
        owner_id: OwnerId::new("U2"),
        page: 1,
        page_size: 10,
        include_revoked: true,
    })?;
    ensure(
        page.items.len() == 1 && page.items[0].status == CertificateStatus::Revoked,
        "U2 holds a single revoked certificate",
    )?;

    let audit = runtime.service.audit_statistics(None, None)?;
    println!(
        "      Audit: generated={} revoked={} failed attempts={}",
        audit.generated, audit.revoked, audit.failed_attempts
    );
    ensure(audit.generated == 1, "one generation audited")?;
    ensure(
        audit.failed_attempts as usize == (ISSUING_THREADS - 1) + 1 + (REVOKING_THREADS - 1),
        "every rejected attempt audited",
    )?;
    print_integrity(ledger.verify_integrity());
    ensure(ledger.verify_integrity(), "audit chain verifies under contention")?;

    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}
