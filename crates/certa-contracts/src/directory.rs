//! Data returned by the owner, activity, and participation collaborators.
//!
//! Profile management, scheduling, and enrollment are owned by the
//! surrounding system. The certificate core only reads these shapes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::{ActivityId, EnrollmentId, OwnerId};
use crate::error::{CertError, CertResult};

/// System-wide role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Participant,
    Speaker,
    Organizer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "participant",
            Role::Speaker => "speaker",
            Role::Organizer => "organizer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CertError;

    fn from_str(s: &str) -> CertResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "participant" => Ok(Role::Participant),
            "speaker" => Ok(Role::Speaker),
            "organizer" => Ok(Role::Organizer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(CertError::ConfigError {
                reason: format!("unknown role '{other}'"),
            }),
        }
    }
}

/// Profile data of a certificate owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerData {
    pub owner_id: OwnerId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Academic or professional title printed on certificates.
    pub title: Option<String>,
}

/// The part an owner played in a specific activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRole {
    Speaker,
    Organizer,
    Winner,
}

/// A scheduled activity of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub activity_id: ActivityId,
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub speakers: Vec<OwnerId>,
    #[serde(default)]
    pub organizers: Vec<OwnerId>,
    /// Owners awarded in this activity, paired with the award text.
    #[serde(default)]
    pub winners: Vec<(OwnerId, String)>,
}

impl ActivityInfo {
    /// Whether `owner` holds `role` in this activity.
    pub fn has_role(&self, owner: &OwnerId, role: ActivityRole) -> bool {
        match role {
            ActivityRole::Speaker => self.speakers.contains(owner),
            ActivityRole::Organizer => self.organizers.contains(owner),
            ActivityRole::Winner => self.winners.iter().any(|(w, _)| w == owner),
        }
    }

    /// The award text for `owner`, if they won something here.
    pub fn award_for(&self, owner: &OwnerId) -> Option<&str> {
        self.winners
            .iter()
            .find(|(w, _)| w == owner)
            .map(|(_, award)| award.as_str())
    }
}

/// An owner's registration in an activity, with recorded participation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub enrollment_id: EnrollmentId,
    pub owner_id: OwnerId,
    pub activity_id: ActivityId,
    /// Share of the activity's sessions attended, 0.0 to 100.0.
    pub attendance_percent: f64,
    pub participation_minutes: u32,
}
