//! Storage row for a certificate and its mapping to the domain type.
//!
//! Enumerations are stored as their lowercase names and the metadata as a
//! JSON blob, the way a relational table would hold them. Reading a row back
//! re-validates every field, so a corrupted row surfaces as a `Storage`
//! error instead of a silently wrong certificate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certa_contracts::{
    certificate::{
        ActivityId, Certificate, CertificateId, CertificateMetadata, CertificateStatus,
        CertificateType, EnrollmentId, OwnerId,
    },
    error::{CertError, CertResult},
};

/// certificate storage row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRow {
    pub id: i64,
    pub hash: String,
    pub verification_code: String,
    pub certificate_type: String,
    pub status: String,
    pub owner_id: String,
    pub activity_id: Option<String>,
    pub enrollment_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: String,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub download_url: String,
}

impl CertificateRow {
    pub fn status(&self) -> CertResult<CertificateStatus> {
        self.status.parse()
    }

    /// Whether this row occupies the active slot for its tuple at `now`.
    pub(crate) fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificateStatus::Active.as_str()
            && self.expires_at.map_or(true, |expires| expires > now)
    }

    pub(crate) fn matches_tuple(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
    ) -> bool {
        self.owner_id == owner_id.as_str()
            && self.certificate_type == certificate_type.as_str()
            && self.activity_id.as_deref() == activity_id.map(ActivityId::as_str)
    }
}

impl TryFrom<&CertificateRow> for Certificate {
    type Error = CertError;

    fn try_from(row: &CertificateRow) -> CertResult<Self> {
        let id = u64::try_from(row.id).map_err(|_| CertError::Storage {
            reason: format!("certificate row has negative id {}", row.id),
        })?;
        let certificate_type: CertificateType =
            row.certificate_type.parse().map_err(|e| CertError::Storage {
                reason: format!("certificate {}: {}", row.id, e),
            })?;

        Ok(Certificate {
            id: CertificateId(id),
            hash: row.hash.clone(),
            verification_code: row.verification_code.clone(),
            certificate_type,
            status: row.status()?,
            owner_id: OwnerId::new(row.owner_id.clone()),
            activity_id: row.activity_id.clone().map(ActivityId::new),
            enrollment_id: row.enrollment_id.clone().map(EnrollmentId::new),
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            metadata: CertificateMetadata::from_blob(&row.metadata)?,
            revocation_reason: row.revocation_reason.clone(),
            revoked_at: row.revoked_at,
            download_url: row.download_url.clone(),
        })
    }
}

impl TryFrom<&Certificate> for CertificateRow {
    type Error = CertError;

    fn try_from(certificate: &Certificate) -> CertResult<Self> {
        let id = i64::try_from(certificate.id.0).map_err(|_| CertError::Storage {
            reason: format!("certificate id {} does not fit a row id", certificate.id),
        })?;

        Ok(CertificateRow {
            id,
            hash: certificate.hash.clone(),
            verification_code: certificate.verification_code.clone(),
            certificate_type: certificate.certificate_type.as_str().to_string(),
            status: certificate.status.as_str().to_string(),
            owner_id: certificate.owner_id.as_str().to_string(),
            activity_id: certificate.activity_id.as_ref().map(|a| a.as_str().to_string()),
            enrollment_id: certificate
                .enrollment_id
                .as_ref()
                .map(|e| e.as_str().to_string()),
            issued_at: certificate.issued_at,
            expires_at: certificate.expires_at,
            metadata: certificate.metadata.to_blob()?,
            revocation_reason: certificate.revocation_reason.clone(),
            revoked_at: certificate.revoked_at,
            download_url: certificate.download_url.clone(),
        })
    }
}
