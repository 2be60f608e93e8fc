//! The audit service: one logging call per lifecycle action.
//!
//! `AuditService` turns orchestrator events into `AuditLogEntry` values and
//! appends them to an `AuditLedger`. Every `log_*` method returns the ledger
//! result; the orchestrator inspects it and deliberately discards failures
//! (see `CertificatesService`), so a ledger outage never changes the outcome
//! of the primary operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use certa_contracts::{
    audit::{AuditAction, AuditDetails, AuditLogEntry, AuditQuery, AuditStatistics},
    certificate::{Certificate, CertificateId, OwnerId},
    error::CertResult,
    request::ValidationResult,
};

use crate::traits::{AuditLedger, Clock};

/// Writes and reads the certificate audit trail.
#[derive(Clone)]
pub struct AuditService {
    ledger: Arc<dyn AuditLedger>,
    clock: Arc<dyn Clock>,
}

impl AuditService {
    pub fn new(ledger: Arc<dyn AuditLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    fn entry(&self, action: AuditAction, details: AuditDetails) -> AuditLogEntry {
        let mut entry = AuditLogEntry::new(action, self.clock.now());
        entry.details = details;
        entry
    }

    fn append(&self, entry: AuditLogEntry) -> CertResult<AuditLogEntry> {
        let action = entry.action;
        let stored = self.ledger.append(entry)?;
        debug!(
            audit_id = stored.id,
            action = %action,
            success = stored.success,
            "audit entry appended"
        );
        Ok(stored)
    }

    /// Record the issuance of `certificate`.
    pub fn log_generation(
        &self,
        actor: &OwnerId,
        certificate: &Certificate,
        details: AuditDetails,
    ) -> CertResult<AuditLogEntry> {
        let entry = self
            .entry(AuditAction::Generation, details)
            .actor(Some(actor))
            .owner(Some(&certificate.owner_id))
            .certificate(Some(certificate.id))
            .detail("certificate_type", certificate.certificate_type.as_str())
            .detail("verification_code", certificate.verification_code.as_str());
        self.append(entry)
    }

    /// Record a validation outcome. `certificate` is `None` when the lookup
    /// found nothing; the entry is then a failure with reason `not_found`.
    pub fn log_validation(
        &self,
        actor: Option<&OwnerId>,
        certificate: Option<&Certificate>,
        outcome: &ValidationResult,
        details: AuditDetails,
    ) -> CertResult<AuditLogEntry> {
        let mut entry = self
            .entry(AuditAction::Validation, details)
            .actor(actor)
            .owner(certificate.map(|c| &c.owner_id))
            .certificate(certificate.map(|c| c.id))
            .detail("is_valid", outcome.is_valid);
        if let Some(reason) = outcome.reason {
            entry = entry
                .detail("reason", reason.as_str())
                .failed(outcome.message.clone());
        }
        self.append(entry)
    }

    /// Record the revocation of `certificate` with `reason`.
    pub fn log_revocation(
        &self,
        actor: &OwnerId,
        certificate: &Certificate,
        reason: &str,
        details: AuditDetails,
    ) -> CertResult<AuditLogEntry> {
        let entry = self
            .entry(AuditAction::Revocation, details)
            .actor(Some(actor))
            .owner(Some(&certificate.owner_id))
            .certificate(Some(certificate.id))
            .detail("reason", reason);
        self.append(entry)
    }

    /// Record that `replacement` was issued in place of `original`.
    pub fn log_reissuance(
        &self,
        actor: &OwnerId,
        original: &Certificate,
        replacement: &Certificate,
        details: AuditDetails,
    ) -> CertResult<AuditLogEntry> {
        let entry = self
            .entry(AuditAction::Reissuance, details)
            .actor(Some(actor))
            .owner(Some(&replacement.owner_id))
            .certificate(Some(replacement.id))
            .detail("original_certificate_id", original.id.0)
            .detail("new_certificate_id", replacement.id.0)
            .detail("original_status", original.status.as_str());
        self.append(entry)
    }

    /// Record a rejected or failed `operation` ("generation", "revocation",
    /// "reissuance").
    pub fn log_failed_attempt(
        &self,
        operation: &str,
        actor: Option<&OwnerId>,
        owner: Option<&OwnerId>,
        certificate_id: Option<CertificateId>,
        error: &str,
        details: AuditDetails,
    ) -> CertResult<AuditLogEntry> {
        let entry = self
            .entry(AuditAction::FailedAttempt, details)
            .actor(actor)
            .owner(owner)
            .certificate(certificate_id)
            .detail("operation", operation)
            .failed(error);
        self.append(entry)
    }

    /// The most recent `limit` entries concerning `owner` and/or `certificate`.
    pub fn history(
        &self,
        owner: Option<&OwnerId>,
        certificate: Option<CertificateId>,
        limit: usize,
    ) -> CertResult<Vec<AuditLogEntry>> {
        self.ledger.query(&AuditQuery {
            owner_id: owner.cloned(),
            certificate_id: certificate,
            since: None,
            until: None,
            limit: Some(limit),
        })
    }

    /// Aggregate counts of entries timestamped within [start, end].
    pub fn statistics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> CertResult<AuditStatistics> {
        let entries = self.ledger.query(&AuditQuery {
            since: start,
            until: end,
            ..AuditQuery::default()
        })?;

        let mut stats = AuditStatistics::default();
        for entry in &entries {
            stats.total += 1;
            match entry.action {
                AuditAction::Generation => stats.generated += 1,
                AuditAction::Validation => {
                    stats.validated += 1;
                    if entry.success {
                        stats.validation_succeeded += 1;
                    } else {
                        stats.validation_failed += 1;
                    }
                }
                AuditAction::Revocation => stats.revoked += 1,
                AuditAction::Reissuance => stats.reissued += 1,
                AuditAction::FailedAttempt => stats.failed_attempts += 1,
            }
        }
        Ok(stats)
    }
}
