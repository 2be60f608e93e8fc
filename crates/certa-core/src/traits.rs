//! Collaborator contracts consumed by the certificate orchestrator.
//!
//! These traits define every boundary of the certificate core:
//!
//! - `CertificateRepository`: persistence of certificate records
//! - `AuditLedger`: append-only store for audit entries
//! - `CertificateGenerator`: hashes, verification codes, artifact bytes
//! - `ArtifactStorage`: where rendered artifacts are written
//! - `OwnerDirectory`, `ActivityDirectory`, `ParticipationRecords`: read-only
//!   views of the surrounding system
//! - `EligibilityValidator`: business requirements per certificate type
//! - `AuthorizationPolicy`: capability predicates applied by callers
//! - `Clock`: the single source of "now"
//!
//! All traits are `Send + Sync`: the orchestrator is shared across request
//! threads and every collaborator must tolerate concurrent calls.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use certa_contracts::{
    audit::{AuditLogEntry, AuditQuery},
    capability::Actor,
    certificate::{
        ActivityId, Certificate, CertificateContext, CertificateId, CertificateStatus,
        CertificateType, EnrollmentId, NewCertificate, OwnerId,
    },
    directory::{ActivityInfo, EnrollmentRecord, OwnerData},
    eligibility::EligibilityResult,
    error::CertResult,
    request::GenerateRequest,
};

/// Aggregate counts returned by a single repository statistics query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryCounts {
    pub total: u64,
    /// Counts by effective status at the query instant.
    pub by_status: BTreeMap<CertificateStatus, u64>,
    pub by_type: BTreeMap<CertificateType, u64>,
    /// Certificates with `issued_at >= issued_since`.
    pub issued_since: u64,
    pub distinct_owners: u64,
}

/// The persistence boundary for certificate records.
///
/// Reads are side-effect free. The two writes are atomic with respect to
/// each other and to concurrent callers:
///
/// - `create` enforces uniqueness of `hash`, `verification_code`, and at
///   most one effectively active certificate per (owner, type, activity).
///   A collision returns `CertError::UniqueViolation` naming the constraint;
///   the repository never retries on its own.
/// - `update_status` is a compare-and-set on the current status.
pub trait CertificateRepository: Send + Sync {
    /// Insert a new certificate with status `Active` and return it with its id.
    fn create(&self, certificate: NewCertificate) -> CertResult<Certificate>;

    fn get_by_id(&self, id: CertificateId) -> CertResult<Option<Certificate>>;

    fn get_by_hash(&self, hash: &str) -> CertResult<Option<Certificate>>;

    fn get_by_verification_code(&self, code: &str) -> CertResult<Option<Certificate>>;

    /// The certificate occupying the (owner, type, activity) slot at `now`,
    /// i.e. with status `Active` and not past its expiry.
    fn find_active(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
        now: DateTime<Utc>,
    ) -> CertResult<Option<Certificate>>;

    /// One page (1-based) of the owner's certificates, newest first.
    fn list_by_owner(
        &self,
        owner_id: &OwnerId,
        include_revoked: bool,
        page: u32,
        page_size: u32,
    ) -> CertResult<Vec<Certificate>>;

    /// Total matching `list_by_owner` with the same filter.
    fn count_by_owner(&self, owner_id: &OwnerId, include_revoked: bool) -> CertResult<u64>;

    /// Move certificate `id` to `status`, recording `reason` and `at` when
    /// the target is `Revoked`.
    ///
    /// Returns `Ok(false)` if the record does not exist and
    /// `Err(InvalidTransition)` if the stored status does not permit the
    /// transition. Exactly one of several concurrent callers can win.
    fn update_status(
        &self,
        id: CertificateId,
        status: CertificateStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> CertResult<bool>;

    /// Aggregate counts over the whole collection.
    fn counts(
        &self,
        now: DateTime<Utc>,
        issued_since: DateTime<Utc>,
    ) -> CertResult<RepositoryCounts>;
}

/// The append-only audit store.
///
/// Entries are never modified or deleted once appended.
pub trait AuditLedger: Send + Sync {
    /// Append `entry`, returning it with its ledger-assigned id.
    fn append(&self, entry: AuditLogEntry) -> CertResult<AuditLogEntry>;

    /// Entries matching `query`, newest first, truncated to `query.limit`.
    fn query(&self, query: &AuditQuery) -> CertResult<Vec<AuditLogEntry>>;
}

/// Produces the identifiers and the rendered artifact of a certificate.
///
/// The orchestrator treats this as a pure function and never retries a
/// failed `generate_artifact`.
pub trait CertificateGenerator: Send + Sync {
    /// A unique, non-reversible verification hash. Successive calls with the
    /// same arguments must return different values.
    fn generate_hash(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        issued_at: DateTime<Utc>,
    ) -> String;

    /// An independent random short code for manual verification.
    fn generate_verification_code(&self) -> String;

    /// Render the certificate artifact.
    fn generate_artifact(
        &self,
        request: &GenerateRequest,
        owner: &OwnerData,
        context: &CertificateContext,
    ) -> CertResult<Vec<u8>>;
}

/// Where rendered artifacts are kept.
pub trait ArtifactStorage: Send + Sync {
    /// Persist `bytes` under `name` and return a retrievable reference.
    fn store(&self, name: &str, bytes: &[u8]) -> CertResult<String>;

    /// Remove a previously stored artifact. Used to clean up after a failed
    /// record insert.
    fn discard(&self, reference: &str) -> CertResult<()>;
}

/// Read access to user profiles.
pub trait OwnerDirectory: Send + Sync {
    fn owner(&self, owner_id: &OwnerId) -> CertResult<Option<OwnerData>>;
}

/// Read access to the event schedule.
pub trait ActivityDirectory: Send + Sync {
    fn activity(&self, activity_id: &ActivityId) -> CertResult<Option<ActivityInfo>>;
}

/// Read access to enrollments and recorded attendance.
pub trait ParticipationRecords: Send + Sync {
    fn enrollment(
        &self,
        owner_id: &OwnerId,
        activity_id: &ActivityId,
    ) -> CertResult<Option<EnrollmentRecord>>;
}

/// Decides whether an owner may receive a certificate type.
pub trait EligibilityValidator: Send + Sync {
    /// Apply the requirement rules for `certificate_type`.
    ///
    /// Ineligibility is returned as `is_eligible = false`, never as an error.
    /// Errors mean a collaborator could not answer.
    fn validate_eligibility(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
        enrollment_id: Option<&EnrollmentId>,
    ) -> CertResult<EligibilityResult>;

    /// Whether an effectively active certificate already occupies the
    /// (owner, type, activity) slot.
    fn has_existing_certificate(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
    ) -> CertResult<bool>;
}

/// Capability predicates applied by callers before invoking the core.
///
/// The orchestrator never calls these; it performs business-rule checks only.
pub trait AuthorizationPolicy: Send + Sync {
    fn can_generate_for(&self, actor: &Actor, target: &OwnerId) -> bool;
    fn can_revoke(&self, actor: &Actor) -> bool;
    fn can_reissue(&self, actor: &Actor) -> bool;
    fn can_view_statistics(&self, actor: &Actor) -> bool;
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
