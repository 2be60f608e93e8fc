//! Scenario 4: Expiry and Reissue
//!
//! Summit certificates are valid for 365 days. A year later:
//!
//! 1. Staff issue U2 a participation certificate for A1 on day one
//! 2. The clock moves 366 days → validation reports `expired`, and the
//!    statistics count it as expired although it was never revoked
//! 3. Staff reissue the expired certificate → a new one valid for another year
//! 4. Reissuing the still-active replacement is rejected
//! 5. A request cancelled by its caller stores nothing
//!
//! The clock is the runtime's `FixedClock`; nothing sleeps.

use chrono::Duration;

use certa_contracts::{
    certificate::{ActivityId, CertificateStatus, CertificateType, OwnerId},
    error::{CertError, CertResult},
    request::{GenerateRequest, InvalidReason, ReissueRequest, ValidateRequest},
};
use certa_core::{cancel::CancellationToken, traits::Clock};

use crate::runtime::EventRuntime;

use super::{ensure, print_integrity};

pub fn run_scenario() -> CertResult<()> {
    println!("=== Scenario 4: Expiry and Reissue ===");
    println!();

    let (runtime, ledger) = EventRuntime::with_memory_ledger()?;
    let staff = runtime.actor("S1")?;

    // ── Step 1: issue ────────────────────────────────────────────────────────
    println!("  [1] Staff issue U2 a participation certificate for A1");
    let original = runtime
        .generate_as(
            &staff,
            GenerateRequest::new(OwnerId::new("U2"), CertificateType::Participation)
                .with_activity(ActivityId::new("A1")),
        )?
        .allowed()?;
    let expires_at = original.expires_at.ok_or_else(|| CertError::Internal {
        reason: "summit certificates carry an expiry".to_string(),
    })?;
    println!("      Certificate #{} expires {}", original.id, expires_at.to_rfc3339());

    // ── Step 2: a year passes ────────────────────────────────────────────────
    runtime.clock.advance(Duration::days(366));
    println!("  [2] 366 days later ({})", runtime.clock.now().format("%Y-%m-%d"));
    let result = runtime.service.validate(
        &ValidateRequest {
            hash: original.hash.clone(),
            include_metadata: false,
        },
        None,
    )?;
    println!(
        "      valid={} reason={}",
        result.is_valid,
        result.reason.map(|r| r.as_str()).unwrap_or("-")
    );
    ensure(
        result.reason == Some(InvalidReason::Expired),
        "validation reports expiry",
    )?;
    let stored = runtime.service.get_certificate(original.id)?;
    ensure(
        stored.status == CertificateStatus::Active,
        "expiry is derived, never written",
    )?;

    let stats = runtime.statistics_as(&staff)?.allowed()?;
    let expired = stats
        .by_status
        .get(&CertificateStatus::Expired)
        .copied()
        .unwrap_or(0);
    println!(
        "      Statistics: total={} expired={} issued in last {} days={}",
        stats.total, expired, stats.window_days, stats.issued_last_window
    );
    ensure(expired == 1, "statistics count the certificate as expired")?;

    // ── Step 3: reissue ──────────────────────────────────────────────────────
    println!("  [3] Staff reissue certificate #{}", original.id);
    let outcome = runtime
        .reissue_as(
            &staff,
            ReissueRequest {
                original_certificate_id: original.id,
            },
        )?
        .allowed()?;
    let replacement = outcome.certificate;
    println!(
        "      Replacement #{} expires {}",
        replacement.id,
        replacement
            .expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    );
    ensure(
        replacement.expires_at > original.expires_at,
        "replacement gets a fresh validity period",
    )?;

    // ── Step 4: reissue an active certificate ────────────────────────────────
    println!("  [4] Staff try to reissue the active replacement");
    match runtime.reissue_as(
        &staff,
        ReissueRequest {
            original_certificate_id: replacement.id,
        },
    ) {
        Err(err @ CertError::InvalidTransition { .. }) => println!("      Rejected: {}", err),
        other => {
            return Err(CertError::Internal {
                reason: format!("expected InvalidTransition, got {:?}", other),
            })
        }
    }

    // ── Step 5: cancellation ─────────────────────────────────────────────────
    println!("  [5] A cancelled request for U2's A2 attendance certificate");
    let before = runtime.storage.len();
    let cancel = CancellationToken::new();
    cancel.cancel();
    match runtime.service.generate_with_cancel(
        GenerateRequest::new(OwnerId::new("U2"), CertificateType::Attendance)
            .with_activity(ActivityId::new("A2")),
        &staff.id,
        &cancel,
    ) {
        Err(err @ CertError::Cancelled { .. }) => println!("      {}", err),
        other => {
            return Err(CertError::Internal {
                reason: format!("expected Cancelled, got {:?}", other),
            })
        }
    }
    ensure(
        runtime.storage.len() == before && runtime.repository.len() == 2,
        "cancelled request left no trace in storage",
    )?;

    print_integrity(ledger.verify_integrity());
    ensure(ledger.verify_integrity(), "audit chain verifies")?;

    println!();
    println!("  Scenario 4 complete.");
    println!();

    Ok(())
}
