//! Inbound requests and outbound results of the certificate operations.
//!
//! These are the boundary shapes the routing layer builds and consumes.
//! They carry no behaviour beyond small constructors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::{
    ActivityId, Certificate, CertificateContext, CertificateId, CertificateMetadata,
    CertificateStatus, CertificateType, EnrollmentId, OwnerId,
};

/// Request to issue a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub owner_id: OwnerId,
    pub certificate_type: CertificateType,
    #[serde(default)]
    pub activity_id: Option<ActivityId>,
    #[serde(default)]
    pub enrollment_id: Option<EnrollmentId>,
    /// Caller-supplied rendering context. Built from the activity when absent.
    #[serde(default)]
    pub context: Option<CertificateContext>,
}

impl GenerateRequest {
    pub fn new(owner_id: OwnerId, certificate_type: CertificateType) -> Self {
        Self {
            owner_id,
            certificate_type,
            activity_id: None,
            enrollment_id: None,
            context: None,
        }
    }

    pub fn with_activity(mut self, activity_id: ActivityId) -> Self {
        self.activity_id = Some(activity_id);
        self
    }

    pub fn with_enrollment(mut self, enrollment_id: EnrollmentId) -> Self {
        self.enrollment_id = Some(enrollment_id);
        self
    }

    pub fn with_context(mut self, context: CertificateContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Request to check a certificate by its verification hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub hash: String,
    #[serde(default)]
    pub include_metadata: bool,
}

/// Request to revoke an active certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub certificate_id: CertificateId,
    pub reason: String,
}

/// Request to replace a revoked or expired certificate with a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReissueRequest {
    pub original_certificate_id: CertificateId,
}

/// Paginated listing of one owner's certificates. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub owner_id: OwnerId,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub include_revoked: bool,
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Why a validation came back invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotFound,
    Revoked,
    Expired,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::NotFound => "not_found",
            InvalidReason::Revoked => "revoked",
            InvalidReason::Expired => "expired",
        }
    }
}

/// Public view of a certificate returned by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub id: CertificateId,
    pub certificate_type: CertificateType,
    pub owner_id: OwnerId,
    pub activity_id: Option<ActivityId>,
    /// Status as of the validation instant (derived expiry applied).
    pub status: CertificateStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl CertificateSummary {
    pub fn of(certificate: &Certificate, now: DateTime<Utc>) -> Self {
        Self {
            id: certificate.id,
            certificate_type: certificate.certificate_type,
            owner_id: certificate.owner_id.clone(),
            activity_id: certificate.activity_id.clone(),
            status: certificate.effective_status(now),
            issued_at: certificate.issued_at,
            expires_at: certificate.expires_at,
            revoked_at: certificate.revoked_at,
        }
    }
}

/// Outcome of a validation.
///
/// For unknown or malformed input the message is always the same neutral
/// text and `certificate` is `None`, so callers learn nothing beyond
/// "not valid".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub reason: Option<InvalidReason>,
    pub message: String,
    pub certificate: Option<CertificateSummary>,
    /// Present only when requested and the certificate exists.
    pub metadata: Option<CertificateMetadata>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub const VALID_MESSAGE: &'static str = "certificate is valid";
    pub const NOT_FOUND_MESSAGE: &'static str = "certificate could not be validated";
    pub const REVOKED_MESSAGE: &'static str = "certificate has been revoked";
    pub const EXPIRED_MESSAGE: &'static str = "certificate has expired";

    /// The neutral answer for unknown or malformed lookups.
    pub fn not_found(validated_at: DateTime<Utc>) -> Self {
        Self {
            is_valid: false,
            reason: Some(InvalidReason::NotFound),
            message: Self::NOT_FOUND_MESSAGE.to_string(),
            certificate: None,
            metadata: None,
            validated_at,
        }
    }
}

/// Result of a successful reissuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReissueOutcome {
    pub original_id: CertificateId,
    pub certificate: Certificate,
}

/// One page of an owner's certificates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificatePage {
    pub items: Vec<Certificate>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Aggregate figures over the whole certificate collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateStatistics {
    pub total: u64,
    /// Counts by effective status; date-expired active records count as expired.
    pub by_status: BTreeMap<CertificateStatus, u64>,
    pub by_type: BTreeMap<CertificateType, u64>,
    /// Certificates issued within the trailing window.
    pub issued_last_window: u64,
    pub window_days: u32,
    /// Revoked / total, 0.0 when there are no certificates.
    pub revocation_rate: f64,
    /// Total / distinct owners, 0.0 when there are no owners.
    pub average_per_owner: f64,
}
