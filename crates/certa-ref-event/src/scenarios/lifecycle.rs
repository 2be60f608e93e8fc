//! Scenario 1: Certificate Lifecycle
//!
//! Walks one speaker certificate through its whole life:
//!
//! 1. U1 issues a speaker certificate for session A1 → Active
//! 2. U1 asks again for the same (owner, type, activity) → DuplicateCertificate
//! 3. A participant tries to revoke it → denied by authorization
//! 4. The admin revokes it for "data correction" → Revoked; a second revoke
//!    is rejected as an invalid transition
//! 5. Registration staff reissue it → a new Active certificate, fresh hash
//! 6. Validation: the original hash reports `revoked`, the new hash and its
//!    verification code report valid, garbage input reports `not_found`
//! 7. Listing, statistics, audit history, and the audit chain are inspected

use certa_contracts::{
    certificate::{ActivityId, CertificateStatus, CertificateType, OwnerId},
    error::{CertError, CertResult},
    request::{
        GenerateRequest, InvalidReason, ListRequest, ReissueRequest, RevokeRequest,
        ValidateRequest,
    },
};

use crate::runtime::{EventRuntime, Gate};

use super::{ensure, print_integrity};

pub fn run_scenario() -> CertResult<()> {
    println!("=== Scenario 1: Certificate Lifecycle ===");
    println!();

    let (runtime, ledger) = EventRuntime::with_memory_ledger()?;
    let speaker = runtime.actor("U1")?;
    let participant = runtime.actor("U2")?;
    let staff = runtime.actor("S1")?;
    let admin = runtime.actor("ADMIN")?;

    let request = GenerateRequest::new(OwnerId::new("U1"), CertificateType::Speaker)
        .with_activity(ActivityId::new("A1"));

    // ── Step 1: issue ────────────────────────────────────────────────────────
    println!("  [1] U1 requests a speaker certificate for session A1");
    let original = runtime.generate_as(&speaker, request.clone())?.allowed()?;
    println!("      Issued certificate #{} ({})", original.id, original.status);
    println!("      Hash:              {}", original.hash);
    println!("      Verification code: {}", original.verification_code);
    println!("      Artifact:          {}", original.download_url);
    ensure(original.status == CertificateStatus::Active, "new certificate is active")?;

    // ── Step 2: duplicate ────────────────────────────────────────────────────
    println!("  [2] U1 requests the same certificate again");
    match runtime.generate_as(&speaker, request) {
        Err(err @ CertError::DuplicateCertificate { .. }) => {
            println!("      Rejected: {}", err.public_message());
        }
        other => {
            return Err(CertError::Internal {
                reason: format!("expected DuplicateCertificate, got {:?}", other),
            })
        }
    }

    // ── Step 3: unauthorized revoke ──────────────────────────────────────────
    let revoke = RevokeRequest {
        certificate_id: original.id,
        reason: "data correction".to_string(),
    };
    println!("  [3] Participant U2 tries to revoke certificate #{}", original.id);
    let gate = runtime.revoke_as(&participant, &revoke)?;
    if let Gate::Denied { action } = &gate {
        println!("      DENIED: U2 lacks the capability to {}", action);
    }
    ensure(gate.is_denied(), "participants cannot revoke")?;

    // ── Step 4: revoke ───────────────────────────────────────────────────────
    println!("  [4] Admin revokes certificate #{} (\"{}\")", original.id, revoke.reason);
    let revoked = runtime.revoke_as(&admin, &revoke)?.allowed()?;
    println!(
        "      Status: {} at {}",
        revoked.status,
        revoked
            .revoked_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    );
    ensure(revoked.status == CertificateStatus::Revoked, "certificate is revoked")?;

    match runtime.revoke_as(&admin, &revoke) {
        Err(err @ CertError::InvalidTransition { .. }) => {
            println!("      Second revoke rejected: {}", err);
        }
        other => {
            return Err(CertError::Internal {
                reason: format!("expected InvalidTransition, got {:?}", other),
            })
        }
    }

    // ── Step 5: reissue ──────────────────────────────────────────────────────
    println!("  [5] Registration staff reissue certificate #{}", original.id);
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
        "      Replacement #{} issued; reissued from #{}",
        replacement.id, outcome.original_id
    );
    ensure(replacement.hash != original.hash, "replacement carries a fresh hash")?;
    ensure(
        replacement.metadata.reissued_from == Some(original.id),
        "replacement records its origin",
    )?;

    // ── Step 6: validate ─────────────────────────────────────────────────────
    println!("  [6] Validating");
    let old = runtime.service.validate(
        &ValidateRequest {
            hash: original.hash.clone(),
            include_metadata: false,
        },
        None,
    )?;
    println!(
        "      Original hash:    valid={} reason={}",
        old.is_valid,
        old.reason.map(|r| r.as_str()).unwrap_or("-")
    );
    ensure(
        !old.is_valid && old.reason == Some(InvalidReason::Revoked),
        "original hash reports revoked",
    )?;

    let new = runtime.service.validate(
        &ValidateRequest {
            hash: replacement.hash.clone(),
            include_metadata: true,
        },
        None,
    )?;
    println!(
        "      Replacement hash: valid={} event={}",
        new.is_valid,
        new.metadata
            .as_ref()
            .and_then(|m| m.event_name.as_deref())
            .unwrap_or("-")
    );
    ensure(new.is_valid, "replacement hash is valid")?;

    let by_code = runtime.service.validate_code(
        &replacement.verification_code.to_lowercase(),
        false,
        None,
    )?;
    println!("      Replacement code (lowercased): valid={}", by_code.is_valid);
    ensure(by_code.is_valid, "verification codes are case-insensitive")?;

    let garbage = runtime.service.validate(
        &ValidateRequest {
            hash: "<script>not a hash</script>".to_string(),
            include_metadata: false,
        },
        None,
    )?;
    println!("      Garbage input:    {}", garbage.message);
    ensure(
        garbage.reason == Some(InvalidReason::NotFound),
        "malformed input reads as not found",
    )?;

    // ── Step 7: inspect ──────────────────────────────────────────────────────
    println!("  [7] Inspecting");
    let page = runtime.service.list(&ListRequest {
        owner_id: OwnerId::new("U1"),
        page: 1,
        page_size: 10,
        include_revoked: true,
    })?;
    println!("      U1 holds {} certificate(s):", page.total);
    for item in &page.items {
        println!("        #{} {} {}", item.id, item.certificate_type, item.status);
    }
    ensure(page.total == 2, "listing includes the revoked original")?;

    let stats = runtime.statistics_as(&staff)?.allowed()?;
    println!(
        "      Statistics: total={} revocation rate={:.2}",
        stats.total, stats.revocation_rate
    );

    let history = runtime.service.history(Some(&OwnerId::new("U1")), None, 20)?;
    println!("      Audit history for U1 ({} entries, newest first):", history.len());
    for entry in &history {
        println!(
            "        #{} {} success={}",
            entry.id, entry.action, entry.success
        );
    }
    let audit = runtime.service.audit_statistics(None, None)?;
    println!(
        "      Audit totals: generated={} revoked={} reissued={} failed attempts={}",
        audit.generated, audit.revoked, audit.reissued, audit.failed_attempts
    );

    let export = ledger.export()?;
    println!("      Ledger terminal hash: {}", export.terminal_hash);
    print_integrity(ledger.verify_integrity());
    ensure(ledger.verify_integrity(), "audit chain verifies")?;
    ensure(runtime.service.audit_failures() == 0, "no audit writes failed")?;

    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}
