//! Certificate identity, lifecycle state, and issuance metadata.
//!
//! A `Certificate` is created once, read many times, and only ever mutated
//! through a status transition. Reissuance never touches an existing record;
//! it produces a new one with fresh identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CertError, CertResult};

/// Persistence-assigned, monotonically increasing certificate identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(pub u64);

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Construct an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identity of a certificate recipient (or of an acting user).
    OwnerId
}

string_id! {
    /// Identity of the event activity a certificate refers to.
    ActivityId
}

string_id! {
    /// Identity of the registration that enrolled an owner in an activity.
    EnrollmentId
}

// ── Certificate type ─────────────────────────────────────────────────────────

/// The closed set of certificate kinds. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateType {
    Attendance,
    Participation,
    Speaker,
    Organizer,
    Winner,
}

/// Per-type template configuration.
///
/// `required_fields` names the context fields the type's template cannot
/// render without. The names match the serialized `CertificateContext` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeProfile {
    pub template_id: &'static str,
    pub title: &'static str,
    pub required_fields: &'static [&'static str],
}

const ATTENDANCE_PROFILE: TypeProfile = TypeProfile {
    template_id: "attendance-v1",
    title: "Certificate of Attendance",
    required_fields: &["event_name"],
};

const PARTICIPATION_PROFILE: TypeProfile = TypeProfile {
    template_id: "participation-v1",
    title: "Certificate of Participation",
    required_fields: &["event_name"],
};

const SPEAKER_PROFILE: TypeProfile = TypeProfile {
    template_id: "speaker-v1",
    title: "Speaker Certificate",
    required_fields: &["event_name", "speaker"],
};

const ORGANIZER_PROFILE: TypeProfile = TypeProfile {
    template_id: "organizer-v1",
    title: "Organizer Certificate",
    required_fields: &["event_name"],
};

const WINNER_PROFILE: TypeProfile = TypeProfile {
    template_id: "winner-v1",
    title: "Award Certificate",
    required_fields: &["event_name", "award"],
};

impl CertificateType {
    /// Every certificate type, in declaration order.
    pub const ALL: [CertificateType; 5] = [
        CertificateType::Attendance,
        CertificateType::Participation,
        CertificateType::Speaker,
        CertificateType::Organizer,
        CertificateType::Winner,
    ];

    /// Stable lowercase name, used in rules, audit details, and storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Attendance => "attendance",
            CertificateType::Participation => "participation",
            CertificateType::Speaker => "speaker",
            CertificateType::Organizer => "organizer",
            CertificateType::Winner => "winner",
        }
    }

    /// Template configuration for this type.
    pub fn profile(&self) -> &'static TypeProfile {
        match self {
            CertificateType::Attendance => &ATTENDANCE_PROFILE,
            CertificateType::Participation => &PARTICIPATION_PROFILE,
            CertificateType::Speaker => &SPEAKER_PROFILE,
            CertificateType::Organizer => &ORGANIZER_PROFILE,
            CertificateType::Winner => &WINNER_PROFILE,
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = CertError;

    fn from_str(s: &str) -> CertResult<Self> {
        CertificateType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CertError::ConfigError {
                reason: format!("unknown certificate type '{s}'"),
            })
    }
}

// ── Certificate status ───────────────────────────────────────────────────────

/// Lifecycle state of a certificate.
///
/// Persisted status only changes through an explicit transition. `Expired`
/// is usually derived: an `Active` record past its `expires_at` is reported
/// as `Expired` by [`Certificate::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Active,
    Revoked,
    Expired,
}

impl CertificateStatus {
    pub const ALL: [CertificateStatus; 3] = [
        CertificateStatus::Active,
        CertificateStatus::Revoked,
        CertificateStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Revoked => "revoked",
            CertificateStatus::Expired => "expired",
        }
    }

    /// Whether a persisted record may move from `self` to `next`.
    ///
    /// Only `Active` records move, and only forward. There is no un-revoke.
    pub fn can_transition_to(&self, next: CertificateStatus) -> bool {
        matches!(
            (self, next),
            (CertificateStatus::Active, CertificateStatus::Revoked)
                | (CertificateStatus::Active, CertificateStatus::Expired)
        )
    }

    /// Revoked and Expired certificates are terminal in effect and are the
    /// only valid sources for reissuance.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CertificateStatus::Active)
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = CertError;

    fn from_str(s: &str) -> CertResult<Self> {
        CertificateStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CertError::Storage {
                reason: format!("unknown certificate status '{s}'"),
            })
    }
}

// ── Context and metadata ─────────────────────────────────────────────────────

/// Rendering context for a certificate artifact.
///
/// Either supplied by the caller on a generate request, built from the
/// activity record, or seeded from an original certificate's metadata on
/// reissue. `verification_code` is filled in by the orchestrator right
/// before rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

/// Structured data captured at issuance time and stored with the record.
///
/// Every field is optional; absent fields are omitted from the serialized
/// blob. Immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    /// Name of the event or activity the certificate refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Calendar date of the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    /// Credited duration in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Speaker or instructor of the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    /// Title of the participant as printed on the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    /// Award or placement, for winner certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award: Option<String>,
    /// The user who requested issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<OwnerId>,
    /// The certificate this one replaces, when created by reissuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reissued_from: Option<CertificateId>,
}

impl CertificateMetadata {
    /// Capture the issuance-time view of a rendering context.
    pub fn from_context(context: &CertificateContext) -> Self {
        Self {
            event_name: context.event_name.clone(),
            event_date: context.event_date,
            duration_minutes: context.duration_minutes,
            instructor: context.speaker.clone(),
            participant_title: context.participant_title.clone(),
            award: context.award.clone(),
            ..Self::default()
        }
    }

    /// Seed context for reissuing a certificate carrying this metadata.
    ///
    /// The verification code is deliberately not carried over.
    pub fn to_context(&self) -> CertificateContext {
        CertificateContext {
            event_name: self.event_name.clone(),
            event_date: self.event_date,
            duration_minutes: self.duration_minutes,
            speaker: self.instructor.clone(),
            participant_title: self.participant_title.clone(),
            award: self.award.clone(),
            verification_code: None,
        }
    }

    /// Serialize into the persisted metadata blob.
    pub fn to_blob(&self) -> CertResult<String> {
        serde_json::to_string(self).map_err(|e| CertError::Storage {
            reason: format!("failed to serialize certificate metadata: {e}"),
        })
    }

    /// Parse a persisted metadata blob. An empty blob is empty metadata.
    pub fn from_blob(blob: &str) -> CertResult<Self> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(blob).map_err(|e| CertError::Storage {
            reason: format!("corrupt certificate metadata blob: {e}"),
        })
    }
}

// ── Certificate records ──────────────────────────────────────────────────────

/// Everything needed to insert a certificate. The repository assigns the id
/// and the initial `Active` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCertificate {
    pub hash: String,
    pub verification_code: String,
    pub certificate_type: CertificateType,
    pub owner_id: OwnerId,
    pub activity_id: Option<ActivityId>,
    pub enrollment_id: Option<EnrollmentId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: CertificateMetadata,
    pub download_url: String,
}

/// A stored certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    /// Globally unique, non-guessable lookup key used for validation.
    pub hash: String,
    /// Short human-presentable code for manual verification. Also unique.
    pub verification_code: String,
    pub certificate_type: CertificateType,
    /// Persisted status. Use [`Certificate::effective_status`] for validity.
    pub status: CertificateStatus,
    pub owner_id: OwnerId,
    pub activity_id: Option<ActivityId>,
    pub enrollment_id: Option<EnrollmentId>,
    pub issued_at: DateTime<Utc>,
    /// Absent means the certificate never expires by date.
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: CertificateMetadata,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub download_url: String,
}

impl Certificate {
    /// Build the stored form of `new` with the given id and status `Active`.
    pub fn from_new(id: CertificateId, new: NewCertificate) -> Self {
        Self {
            id,
            hash: new.hash,
            verification_code: new.verification_code,
            certificate_type: new.certificate_type,
            status: CertificateStatus::Active,
            owner_id: new.owner_id,
            activity_id: new.activity_id,
            enrollment_id: new.enrollment_id,
            issued_at: new.issued_at,
            expires_at: new.expires_at,
            metadata: new.metadata,
            revocation_reason: None,
            revoked_at: None,
            download_url: new.download_url,
        }
    }

    /// True when `expires_at` is set and not in the future relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// The status the certificate behaves as at `now`.
    ///
    /// An `Active` record past its expiry is reported as `Expired`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> CertificateStatus {
        match self.status {
            CertificateStatus::Active if self.is_expired_at(now) => CertificateStatus::Expired,
            other => other,
        }
    }

    /// Valid iff persisted status is `Active` and it has not expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == CertificateStatus::Active
    }

    /// Whether this record belongs to the (owner, type, activity) tuple.
    pub fn matches_tuple(
        &self,
        owner_id: &OwnerId,
        certificate_type: CertificateType,
        activity_id: Option<&ActivityId>,
    ) -> bool {
        &self.owner_id == owner_id
            && self.certificate_type == certificate_type
            && self.activity_id.as_ref() == activity_id
    }
}
