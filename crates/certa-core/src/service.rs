//! The certificate orchestrator.
//!
//! `CertificatesService` composes the collaborators into the lifecycle
//! operations and owns the business rules:
//!
//!   Generate: Eligibility → Duplicate pre-check → Owner/Activity lookup
//!             → Identifiers → Artifact → Storage → Insert → Audit
//!   Validate: Lookup → derived status → Audit
//!   Revoke:   Lookup → compare-and-set Active→Revoked → Audit
//!   Reissue:  Lookup → terminal check → Generate(seeded) → Audit
//!
//! Writes happen strictly in the order generate, persist, audit. The
//! duplicate pre-check only avoids wasted rendering; the repository's
//! uniqueness constraint is what guarantees one active certificate per
//! (owner, type, activity).
//!
//! Audit writes are fire-and-forget. Each `log_*` result passes through
//! `settle_audit`, which counts and logs a failure and then drops it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use certa_contracts::{
    audit::{AuditAction, AuditDetails, AuditLogEntry, AuditStatistics},
    certificate::{
        ActivityId, Certificate, CertificateContext, CertificateId, CertificateMetadata,
        CertificateStatus, CertificateType, NewCertificate, OwnerId,
    },
    directory::{ActivityInfo, OwnerData},
    error::{CertError, CertResult, UniqueConstraint},
    request::{
        CertificatePage, CertificateStatistics, CertificateSummary, GenerateRequest,
        InvalidReason, ListRequest, ReissueOutcome, ReissueRequest, RevokeRequest,
        ValidateRequest, ValidationResult,
    },
};

use crate::{
    audit::AuditService,
    cancel::CancellationToken,
    config::ServiceConfig,
    traits::{
        ActivityDirectory, ArtifactStorage, CertificateGenerator, CertificateRepository, Clock,
        EligibilityValidator, OwnerDirectory,
    },
};

/// Longest hash or verification code a lookup will consider.
const MAX_TOKEN_LEN: usize = 128;

/// The collaborators a `CertificatesService` is assembled from.
pub struct ServiceParts {
    pub repository: Arc<dyn CertificateRepository>,
    pub eligibility: Arc<dyn EligibilityValidator>,
    pub generator: Arc<dyn CertificateGenerator>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub activities: Arc<dyn ActivityDirectory>,
    pub audit: AuditService,
    pub clock: Arc<dyn Clock>,
}

/// Issues, validates, revokes, and reissues certificates.
///
/// Holds no lock of its own; every method may be called concurrently from
/// any number of threads.
pub struct CertificatesService {
    repository: Arc<dyn CertificateRepository>,
    eligibility: Arc<dyn EligibilityValidator>,
    generator: Arc<dyn CertificateGenerator>,
    storage: Arc<dyn ArtifactStorage>,
    owners: Arc<dyn OwnerDirectory>,
    activities: Arc<dyn ActivityDirectory>,
    audit: AuditService,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    audit_failures: AtomicU64,
}

impl CertificatesService {
    /// Assemble the service. Fails if `config` does not validate.
    pub fn new(parts: ServiceParts, config: ServiceConfig) -> CertResult<Self> {
        config.validate()?;
        Ok(Self {
            repository: parts.repository,
            eligibility: parts.eligibility,
            generator: parts.generator,
            storage: parts.storage,
            owners: parts.owners,
            activities: parts.activities,
            audit: parts.audit,
            clock: parts.clock,
            config,
            audit_failures: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Number of audit entries that could not be written since startup.
    pub fn audit_failures(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    // ── Generate ─────────────────────────────────────────────────────────────

    /// Issue a certificate for `request.owner_id` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// `Ineligible`, `DuplicateCertificate`, `NotFound` (owner or activity),
    /// `GenerationFailure` (rendering, storage, or identifier exhaustion),
    /// and storage faults. Every failure is recorded as a failed attempt.
    pub fn generate(&self, request: GenerateRequest, actor: &OwnerId) -> CertResult<Certificate> {
        self.generate_with_cancel(request, actor, &CancellationToken::new())
    }

    /// `generate`, aborting with `Cancelled` if `cancel` fires before a
    /// persistence write.
    pub fn generate_with_cancel(
        &self,
        request: GenerateRequest,
        actor: &OwnerId,
        cancel: &CancellationToken,
    ) -> CertResult<Certificate> {
        self.issue(request, actor, cancel, None)
    }

    fn issue(
        &self,
        request: GenerateRequest,
        actor: &OwnerId,
        cancel: &CancellationToken,
        reissue_of: Option<&Certificate>,
    ) -> CertResult<Certificate> {
        let operation = if reissue_of.is_some() { "reissuance" } else { "generation" };

        debug!(
            owner_id = %request.owner_id,
            certificate_type = %request.certificate_type,
            activity_id = ?request.activity_id,
            operation,
            "certificate issuance starting"
        );

        match self.try_issue(&request, actor, cancel, reissue_of) {
            Ok(certificate) => {
                info!(
                    certificate_id = %certificate.id,
                    owner_id = %certificate.owner_id,
                    certificate_type = %certificate.certificate_type,
                    "certificate issued"
                );
                let mut details = AuditDetails::new();
                if let Some(activity) = &certificate.activity_id {
                    details.insert("activity_id".to_string(), json!(activity.as_str()));
                }
                if let Some(original) = reissue_of {
                    details.insert("reissued_from".to_string(), json!(original.id.0));
                }
                self.settle_audit(
                    AuditAction::Generation,
                    self.audit.log_generation(actor, &certificate, details),
                );
                Ok(certificate)
            }
            Err(err) => {
                self.report_failure(operation, &err);
                let mut details = AuditDetails::new();
                details.insert(
                    "certificate_type".to_string(),
                    json!(request.certificate_type.as_str()),
                );
                if let Some(activity) = &request.activity_id {
                    details.insert("activity_id".to_string(), json!(activity.as_str()));
                }
                self.settle_audit(
                    AuditAction::FailedAttempt,
                    self.audit.log_failed_attempt(
                        operation,
                        Some(actor),
                        Some(&request.owner_id),
                        reissue_of.map(|c| c.id),
                        &err.to_string(),
                        details,
                    ),
                );
                Err(err)
            }
        }
    }

    fn try_issue(
        &self,
        request: &GenerateRequest,
        actor: &OwnerId,
        cancel: &CancellationToken,
        reissue_of: Option<&Certificate>,
    ) -> CertResult<Certificate> {
        let activity_id = request.activity_id.as_ref();

        // ── Business rules ───────────────────────────────────────────────────
        let eligibility = self.eligibility.validate_eligibility(
            &request.owner_id,
            request.certificate_type,
            activity_id,
            request.enrollment_id.as_ref(),
        )?;
        if !eligibility.is_eligible {
            return Err(CertError::Ineligible {
                reason: eligibility.message,
            });
        }

        if self.eligibility.has_existing_certificate(
            &request.owner_id,
            request.certificate_type,
            activity_id,
        )? {
            return Err(duplicate(request));
        }

        // ── Collaborator lookups ─────────────────────────────────────────────
        let owner = self
            .owners
            .owner(&request.owner_id)?
            .ok_or_else(|| CertError::not_found("owner", &request.owner_id))?;

        let activity = match activity_id {
            Some(id) => Some(
                self.activities
                    .activity(id)?
                    .ok_or_else(|| CertError::not_found("activity", id))?,
            ),
            None => None,
        };

        let mut context = self.build_context(request, &owner, activity.as_ref())?;

        let mut metadata = CertificateMetadata::from_context(&context);
        metadata.participant_name = Some(owner.full_name.clone());
        metadata.issued_by = Some(actor.clone());
        metadata.reissued_from = reissue_of.map(|c| c.id);

        // ── Identifiers, artifact, persistence ───────────────────────────────
        //
        // Each attempt draws fresh identifiers. A collision, whether seen by
        // the pre-check or by the insert, sends us round again.
        for attempt in 1..=self.config.max_identity_attempts {
            cancel.check("identifier allocation")?;

            let issued_at = self.clock.now();
            let expires_at = self.expiry_for(issued_at)?;
            let hash = self
                .generator
                .generate_hash(&request.owner_id, request.certificate_type, issued_at);
            let verification_code = self.generator.generate_verification_code();

            if self.repository.get_by_hash(&hash)?.is_some()
                || self.repository.get_by_verification_code(&verification_code)?.is_some()
            {
                warn!(attempt, "generated identifier already in use, regenerating");
                continue;
            }

            context.verification_code = Some(verification_code.clone());
            let artifact = self
                .generator
                .generate_artifact(request, &owner, &context)
                .map_err(|e| generation_failure("artifact rendering", e))?;

            cancel.check("artifact storage")?;
            let name = format!("{}.{}", hash, self.config.artifact_extension);
            let download_url = self
                .storage
                .store(&name, &artifact)
                .map_err(|e| generation_failure("artifact storage", e))?;

            if let Err(err) = cancel.check("certificate insert") {
                self.discard_artifact(&download_url);
                return Err(err);
            }

            let new = NewCertificate {
                hash,
                verification_code,
                certificate_type: request.certificate_type,
                owner_id: request.owner_id.clone(),
                activity_id: request.activity_id.clone(),
                enrollment_id: request.enrollment_id.clone(),
                issued_at,
                expires_at,
                metadata: metadata.clone(),
                download_url: download_url.clone(),
            };

            match self.repository.create(new) {
                Ok(certificate) => return Ok(certificate),
                Err(CertError::UniqueViolation {
                    constraint: UniqueConstraint::ActiveTuple,
                }) => {
                    self.discard_artifact(&download_url);
                    return Err(duplicate(request));
                }
                Err(CertError::UniqueViolation { constraint }) => {
                    self.discard_artifact(&download_url);
                    warn!(attempt, %constraint, "identifier collided on insert, regenerating");
                }
                Err(err) => {
                    self.discard_artifact(&download_url);
                    return Err(err);
                }
            }
        }

        Err(CertError::GenerationFailure {
            reason: format!(
                "could not allocate unique identifiers after {} attempt(s)",
                self.config.max_identity_attempts
            ),
        })
    }

    /// Merge the supplied context (if any) over one built from the activity
    /// and owner records. Supplied fields win.
    fn build_context(
        &self,
        request: &GenerateRequest,
        owner: &OwnerData,
        activity: Option<&ActivityInfo>,
    ) -> CertResult<CertificateContext> {
        let supplied = request.context.clone().unwrap_or_default();

        let speaker = match (request.certificate_type, activity) {
            (CertificateType::Speaker, _) => Some(owner.full_name.clone()),
            (_, Some(activity)) => match activity.speakers.first() {
                Some(speaker_id) => self.owners.owner(speaker_id)?.map(|s| s.full_name),
                None => None,
            },
            (_, None) => None,
        };

        Ok(CertificateContext {
            event_name: supplied
                .event_name
                .or_else(|| activity.map(|a| a.name.clone())),
            event_date: supplied
                .event_date
                .or_else(|| activity.and_then(|a| a.starts_at).map(|t| t.date_naive())),
            duration_minutes: supplied
                .duration_minutes
                .or_else(|| activity.and_then(|a| a.duration_minutes)),
            speaker: supplied.speaker.or(speaker),
            participant_title: supplied.participant_title.or_else(|| owner.title.clone()),
            award: supplied.award.or_else(|| {
                activity
                    .and_then(|a| a.award_for(&owner.owner_id))
                    .map(str::to_string)
            }),
            verification_code: None,
        })
    }

    /// Expiry of a certificate issued at `issued_at`, if validity is bounded.
    fn expiry_for(&self, issued_at: DateTime<Utc>) -> CertResult<Option<DateTime<Utc>>> {
        let Some(days) = self.config.default_validity_days else {
            return Ok(None);
        };
        issued_at
            .checked_add_signed(Duration::days(i64::from(days)))
            .map(Some)
            .ok_or_else(|| CertError::ConfigError {
                reason: format!("validity of {days} days runs past the clock range"),
            })
    }

    fn discard_artifact(&self, reference: &str) {
        if let Err(e) = self.storage.discard(reference) {
            warn!(reference, error = %e, "failed to discard orphaned artifact");
        }
    }

    // ── Validate ─────────────────────────────────────────────────────────────

    /// Check a certificate by its verification hash.
    ///
    /// Never fails for unknown or malformed input: those return the neutral
    /// not-found result. Only a repository fault is an error.
    pub fn validate(
        &self,
        request: &ValidateRequest,
        actor: Option<&OwnerId>,
    ) -> CertResult<ValidationResult> {
        let presented = request.hash.trim();
        let found = if is_plausible_token(presented) {
            self.repository.get_by_hash(presented)?
        } else {
            debug!("validation input is not a plausible hash");
            None
        };
        Ok(self.conclude_validation(found, request.include_metadata, actor, "hash"))
    }

    /// Check a certificate by its short verification code.
    pub fn validate_code(
        &self,
        code: &str,
        include_metadata: bool,
        actor: Option<&OwnerId>,
    ) -> CertResult<ValidationResult> {
        let normalized = code.trim().to_ascii_uppercase();
        let found = if is_plausible_token(&normalized) {
            self.repository.get_by_verification_code(&normalized)?
        } else {
            debug!("validation input is not a plausible verification code");
            None
        };
        Ok(self.conclude_validation(found, include_metadata, actor, "verification_code"))
    }

    fn conclude_validation(
        &self,
        found: Option<Certificate>,
        include_metadata: bool,
        actor: Option<&OwnerId>,
        lookup: &str,
    ) -> ValidationResult {
        let now = self.clock.now();

        let result = match &found {
            None => ValidationResult::not_found(now),
            Some(certificate) => {
                let (is_valid, reason, message) = match certificate.effective_status(now) {
                    CertificateStatus::Active => (true, None, ValidationResult::VALID_MESSAGE),
                    CertificateStatus::Revoked => (
                        false,
                        Some(InvalidReason::Revoked),
                        ValidationResult::REVOKED_MESSAGE,
                    ),
                    CertificateStatus::Expired => (
                        false,
                        Some(InvalidReason::Expired),
                        ValidationResult::EXPIRED_MESSAGE,
                    ),
                };
                ValidationResult {
                    is_valid,
                    reason,
                    message: message.to_string(),
                    certificate: Some(CertificateSummary::of(certificate, now)),
                    metadata: include_metadata.then(|| certificate.metadata.clone()),
                    validated_at: now,
                }
            }
        };

        debug!(
            lookup,
            is_valid = result.is_valid,
            reason = ?result.reason,
            "certificate validated"
        );

        let mut details = AuditDetails::new();
        details.insert("lookup".to_string(), json!(lookup));
        self.settle_audit(
            AuditAction::Validation,
            self.audit.log_validation(actor, found.as_ref(), &result, details),
        );

        result
    }

    // ── Revoke ───────────────────────────────────────────────────────────────

    /// Revoke an active certificate and return the updated record.
    ///
    /// Revoking twice is an `InvalidTransition`, never a second success.
    pub fn revoke(&self, request: &RevokeRequest, actor: &OwnerId) -> CertResult<Certificate> {
        match self.try_revoke(request) {
            Ok(certificate) => {
                info!(
                    certificate_id = %certificate.id,
                    actor = %actor,
                    "certificate revoked"
                );
                self.settle_audit(
                    AuditAction::Revocation,
                    self.audit.log_revocation(
                        actor,
                        &certificate,
                        &request.reason,
                        AuditDetails::new(),
                    ),
                );
                Ok(certificate)
            }
            Err(err) => {
                self.report_failure("revocation", &err);
                let mut details = AuditDetails::new();
                details.insert("reason".to_string(), json!(request.reason));
                self.settle_audit(
                    AuditAction::FailedAttempt,
                    self.audit.log_failed_attempt(
                        "revocation",
                        Some(actor),
                        None,
                        Some(request.certificate_id),
                        &err.to_string(),
                        details,
                    ),
                );
                Err(err)
            }
        }
    }

    fn try_revoke(&self, request: &RevokeRequest) -> CertResult<Certificate> {
        let id = request.certificate_id;
        let current = self
            .repository
            .get_by_id(id)?
            .ok_or_else(|| CertError::not_found("certificate", id))?;

        if current.status == CertificateStatus::Revoked {
            return Err(already_revoked(id));
        }
        if !current.status.can_transition_to(CertificateStatus::Revoked) {
            return Err(CertError::InvalidTransition {
                reason: format!("certificate {} is {} and cannot be revoked", id, current.status),
            });
        }

        let now = self.clock.now();
        match self.repository.update_status(
            id,
            CertificateStatus::Revoked,
            Some(request.reason.as_str()),
            now,
        ) {
            Ok(true) => {}
            Ok(false) => return Err(CertError::not_found("certificate", id)),
            // Lost a race against a concurrent revoke.
            Err(CertError::InvalidTransition { .. }) => return Err(already_revoked(id)),
            Err(err) => return Err(err),
        }

        self.repository
            .get_by_id(id)?
            .ok_or_else(|| CertError::Internal {
                reason: format!("certificate {id} disappeared after revocation"),
            })
    }

    // ── Reissue ──────────────────────────────────────────────────────────────

    /// Replace a revoked or expired certificate with a brand-new active one.
    ///
    /// The original record is never modified.
    pub fn reissue(&self, request: ReissueRequest, actor: &OwnerId) -> CertResult<ReissueOutcome> {
        self.reissue_with_cancel(request, actor, &CancellationToken::new())
    }

    pub fn reissue_with_cancel(
        &self,
        request: ReissueRequest,
        actor: &OwnerId,
        cancel: &CancellationToken,
    ) -> CertResult<ReissueOutcome> {
        let original = match self.load_reissue_source(request.original_certificate_id) {
            Ok(original) => original,
            Err(err) => {
                self.report_failure("reissuance", &err);
                self.settle_audit(
                    AuditAction::FailedAttempt,
                    self.audit.log_failed_attempt(
                        "reissuance",
                        Some(actor),
                        None,
                        Some(request.original_certificate_id),
                        &err.to_string(),
                        AuditDetails::new(),
                    ),
                );
                return Err(err);
            }
        };

        let generate = GenerateRequest {
            owner_id: original.owner_id.clone(),
            certificate_type: original.certificate_type,
            activity_id: original.activity_id.clone(),
            enrollment_id: original.enrollment_id.clone(),
            context: Some(original.metadata.to_context()),
        };

        let certificate = self.issue(generate, actor, cancel, Some(&original))?;

        info!(
            original_id = %original.id,
            new_id = %certificate.id,
            "certificate reissued"
        );
        self.settle_audit(
            AuditAction::Reissuance,
            self.audit
                .log_reissuance(actor, &original, &certificate, AuditDetails::new()),
        );

        Ok(ReissueOutcome {
            original_id: original.id,
            certificate,
        })
    }

    fn load_reissue_source(&self, id: CertificateId) -> CertResult<Certificate> {
        let original = self
            .repository
            .get_by_id(id)?
            .ok_or_else(|| CertError::not_found("certificate", id))?;

        let status = original.effective_status(self.clock.now());
        if !status.is_terminal() {
            return Err(CertError::InvalidTransition {
                reason: format!(
                    "certificate {id} is {status}; only revoked or expired certificates can be reissued"
                ),
            });
        }
        Ok(original)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn get_certificate(&self, id: CertificateId) -> CertResult<Certificate> {
        self.repository
            .get_by_id(id)?
            .ok_or_else(|| CertError::not_found("certificate", id))
    }

    /// One page of an owner's certificates, newest first.
    pub fn list(&self, request: &ListRequest) -> CertResult<CertificatePage> {
        let (page, page_size) = self.config.paging(request.page, request.page_size);
        let total = self
            .repository
            .count_by_owner(&request.owner_id, request.include_revoked)?;
        let items = self.repository.list_by_owner(
            &request.owner_id,
            request.include_revoked,
            page,
            page_size,
        )?;
        let size = u64::from(page_size);
        let total_pages = u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX);

        Ok(CertificatePage {
            items,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    /// Aggregate figures over every stored certificate.
    pub fn statistics(&self) -> CertResult<CertificateStatistics> {
        let now = self.clock.now();
        let window_days = self.config.statistics_window_days;
        let since = now
            .checked_sub_signed(Duration::days(i64::from(window_days)))
            .ok_or_else(|| CertError::ConfigError {
                reason: format!("statistics window of {window_days} days precedes the clock range"),
            })?;
        let counts = self.repository.counts(now, since)?;
        let revoked = counts
            .by_status
            .get(&CertificateStatus::Revoked)
            .copied()
            .unwrap_or(0);

        Ok(CertificateStatistics {
            total: counts.total,
            revocation_rate: ratio(revoked, counts.total),
            average_per_owner: ratio(counts.total, counts.distinct_owners),
            by_status: counts.by_status,
            by_type: counts.by_type,
            issued_last_window: counts.issued_since,
            window_days,
        })
    }

    /// Recent audit entries about an owner and/or a certificate.
    pub fn history(
        &self,
        owner: Option<&OwnerId>,
        certificate: Option<CertificateId>,
        limit: usize,
    ) -> CertResult<Vec<AuditLogEntry>> {
        self.audit.history(owner, certificate, limit)
    }

    pub fn audit_statistics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> CertResult<AuditStatistics> {
        self.audit.statistics(start, end)
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Consume an audit result. Failures are counted and logged, never returned.
    fn settle_audit(&self, action: AuditAction, outcome: CertResult<AuditLogEntry>) {
        if let Err(e) = outcome {
            let failures = self.audit_failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                action = %action,
                error = %e,
                audit_failures = failures,
                "audit write failed; primary operation result unaffected"
            );
        }
    }

    fn report_failure(&self, operation: &str, err: &CertError) {
        if err.is_business_failure() {
            warn!(operation, error = %err, "certificate operation rejected");
        } else {
            error!(operation, error = %err, "certificate operation failed");
        }
    }
}

fn duplicate(request: &GenerateRequest) -> CertError {
    CertError::DuplicateCertificate {
        owner_id: request.owner_id.to_string(),
        certificate_type: request.certificate_type.to_string(),
        activity_id: request
            .activity_id
            .as_ref()
            .map(ActivityId::to_string)
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn already_revoked(id: CertificateId) -> CertError {
    CertError::InvalidTransition {
        reason: format!("certificate {id} is already revoked"),
    }
}

/// Fold a collaborator failure into `GenerationFailure`, keeping the detail.
fn generation_failure(stage: &str, err: CertError) -> CertError {
    match err {
        CertError::GenerationFailure { reason } => CertError::GenerationFailure {
            reason: format!("{stage}: {reason}"),
        },
        other => CertError::GenerationFailure {
            reason: format!("{stage}: {other}"),
        },
    }
}

/// Lookup keys are short runs of ASCII letters, digits, '-' and '_'.
fn is_plausible_token(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_TOKEN_LEN
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
