//! Scenario 3: Audit Outage
//!
//! The audit store goes down during the hack night finals. Certificate
//! operations must carry on regardless:
//!
//! 1. U2's winner certificate for A3 is issued → succeeds, award printed
//! 2. The certificate is validated → valid
//! 3. The admin revokes it → succeeds
//! 4. A rejected reissue attempt by a participant never reaches the service
//!
//! Every audit write fails; the failures are counted and logged as warnings
//! but never surface to the caller. Reading the audit history does fail,
//! since there is nothing to read from.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use certa_contracts::{
    audit::{AuditLogEntry, AuditQuery},
    certificate::{ActivityId, CertificateStatus, CertificateType, OwnerId},
    error::{CertError, CertResult},
    request::{GenerateRequest, ReissueRequest, RevokeRequest, ValidateRequest},
};
use certa_core::traits::AuditLedger;

use crate::runtime::EventRuntime;

use super::ensure;

/// An audit ledger whose backing store is unreachable.
#[derive(Debug, Default)]
pub struct OfflineLedger {
    attempts: AtomicU64,
}

impl OfflineLedger {
    /// How many appends were attempted while offline.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl AuditLedger for OfflineLedger {
    fn append(&self, _entry: AuditLogEntry) -> CertResult<AuditLogEntry> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(CertError::AuditWriteFailed {
            reason: "audit store unreachable".to_string(),
        })
    }

    fn query(&self, _query: &AuditQuery) -> CertResult<Vec<AuditLogEntry>> {
        Err(CertError::Storage {
            reason: "audit store unreachable".to_string(),
        })
    }
}

pub fn run_scenario() -> CertResult<()> {
    println!("=== Scenario 3: Audit Outage ===");
    println!();

    let ledger = Arc::new(OfflineLedger::default());
    let runtime = EventRuntime::new(ledger.clone())?;
    let winner = runtime.actor("U2")?;
    let admin = runtime.actor("ADMIN")?;
    println!("  Audit store: OFFLINE");

    // ── Step 1: issue ────────────────────────────────────────────────────────
    println!("  [1] U2 requests a winner certificate for the A3 finals");
    let certificate = runtime
        .generate_as(
            &winner,
            GenerateRequest::new(OwnerId::new("U2"), CertificateType::Winner)
                .with_activity(ActivityId::new("A3")),
        )?
        .allowed()?;
    println!(
        "      Issued certificate #{} for \"{}\"",
        certificate.id,
        certificate.metadata.award.as_deref().unwrap_or("-")
    );
    ensure(
        certificate.metadata.award.as_deref() == Some("First Place"),
        "award comes from the activity record",
    )?;

    // ── Step 2: validate ─────────────────────────────────────────────────────
    println!("  [2] A recruiter validates the certificate");
    let result = runtime.service.validate(
        &ValidateRequest {
            hash: certificate.hash.clone(),
            include_metadata: false,
        },
        None,
    )?;
    println!("      valid={} ({})", result.is_valid, result.message);
    ensure(result.is_valid, "validation is unaffected by the outage")?;

    // ── Step 3: revoke ───────────────────────────────────────────────────────
    println!("  [3] Admin revokes certificate #{}", certificate.id);
    let revoked = runtime
        .revoke_as(
            &admin,
            &RevokeRequest {
                certificate_id: certificate.id,
                reason: "scoring dispute under review".to_string(),
            },
        )?
        .allowed()?;
    println!("      Status: {}", revoked.status);
    ensure(revoked.status == CertificateStatus::Revoked, "revocation is unaffected")?;

    // ── Step 4: denied reissue ───────────────────────────────────────────────
    println!("  [4] U2 tries to reissue their own certificate");
    let gate = runtime.reissue_as(
        &winner,
        ReissueRequest {
            original_certificate_id: certificate.id,
        },
    )?;
    println!("      Denied: {}", gate.is_denied());
    ensure(gate.is_denied(), "participants cannot reissue")?;

    // ── Outage accounting ────────────────────────────────────────────────────
    let failures = runtime.service.audit_failures();
    println!("  Audit writes attempted: {}", ledger.attempts());
    println!("  Audit writes failed:    {}", failures);
    ensure(failures == 3, "issue, validate, and revoke each lost their audit entry")?;
    ensure(ledger.attempts() == failures, "every attempt was counted")?;

    match runtime.service.history(Some(&OwnerId::new("U2")), None, 10) {
        Err(err) => println!("  Audit history unavailable: {}", err.public_message()),
        Ok(entries) => {
            return Err(CertError::Internal {
                reason: format!("expected history to fail, got {} entries", entries.len()),
            })
        }
    }

    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_outage_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_offline_ledger_counts_attempts() {
        let ledger = OfflineLedger::default();
        let entry = AuditLogEntry::new(
            certa_contracts::audit::AuditAction::Generation,
            chrono::Utc::now(),
        );
        assert!(matches!(
            ledger.append(entry),
            Err(CertError::AuditWriteFailed { .. })
        ));
        assert_eq!(ledger.attempts(), 1);
        assert!(ledger.query(&AuditQuery::default()).is_err());
    }
}
