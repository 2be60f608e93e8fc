//! Simulated event data for the Certa reference runtime.
//!
//! All data in this module is hardcoded and fictional. No external systems are
//! contacted. `EventDirectory` stands in for the user, activity, and
//! enrollment services a production deployment would query.
//!
//! The summit roster:
//!
//! | id    | name             | role        | notes                                  |
//! |-------|------------------|-------------|----------------------------------------|
//! | U1    | Mira Okafor      | speaker     | speaks at A1 and A2                    |
//! | U2    | Tomás Reyes      | participant | full attendance at A1/A2, wins A3      |
//! | U3    | Lena Park        | organizer   | organizes every session                |
//! | U4    | Sam Whitfield    | participant | 40% attendance at A2                   |
//! | S1    | Registration Desk| staff       |                                        |
//! | ADMIN | Platform Admin   | admin       |                                        |

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use certa_contracts::{
    certificate::{ActivityId, EnrollmentId, OwnerId},
    directory::{ActivityInfo, EnrollmentRecord, OwnerData, Role},
    error::CertResult,
};
use certa_core::traits::{ActivityDirectory, OwnerDirectory, ParticipationRecords};

/// The instant the summit runtime's clock starts at: the morning of day one.
pub fn summit_opening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

fn at(day: u32, hour: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).single()
}

/// Owners, activities, and enrollments of the Harbor Systems Summit 2026.
#[derive(Debug, Clone)]
pub struct EventDirectory {
    owners: HashMap<OwnerId, OwnerData>,
    activities: HashMap<ActivityId, ActivityInfo>,
    enrollments: Vec<EnrollmentRecord>,
}

impl EventDirectory {
    /// The full summit roster described in the module docs.
    pub fn summit() -> Self {
        let owners = [
            owner("U1", "Mira Okafor", Role::Speaker, Some("Dr.")),
            owner("U2", "Tomás Reyes", Role::Participant, None),
            owner("U3", "Lena Park", Role::Organizer, None),
            owner("U4", "Sam Whitfield", Role::Participant, None),
            owner("S1", "Registration Desk", Role::Staff, None),
            owner("ADMIN", "Platform Admin", Role::Admin, None),
        ]
        .into_iter()
        .map(|o| (o.owner_id.clone(), o))
        .collect();

        let activities = [
            ActivityInfo {
                activity_id: ActivityId::new("A1"),
                name: "Memory Safety in Practice".to_string(),
                starts_at: at(4, 9),
                duration_minutes: Some(90),
                speakers: vec![OwnerId::new("U1")],
                organizers: vec![OwnerId::new("U3")],
                winners: Vec::new(),
            },
            ActivityInfo {
                activity_id: ActivityId::new("A2"),
                name: "Embedded Systems Workshop".to_string(),
                starts_at: at(5, 14),
                duration_minutes: Some(240),
                speakers: vec![OwnerId::new("U1")],
                organizers: vec![OwnerId::new("U3")],
                winners: Vec::new(),
            },
            ActivityInfo {
                activity_id: ActivityId::new("A3"),
                name: "Harbor Hack Night Finals".to_string(),
                starts_at: at(6, 19),
                duration_minutes: Some(180),
                speakers: Vec::new(),
                organizers: vec![OwnerId::new("U3")],
                winners: vec![(OwnerId::new("U2"), "First Place".to_string())],
            },
        ]
        .into_iter()
        .map(|a| (a.activity_id.clone(), a))
        .collect();

        let enrollments = vec![
            enrollment("E-U2-A1", "U2", "A1", 100.0, 90),
            enrollment("E-U2-A2", "U2", "A2", 92.5, 222),
            enrollment("E-U4-A1", "U4", "A1", 85.0, 40),
            enrollment("E-U4-A2", "U4", "A2", 40.0, 96),
        ];

        Self {
            owners,
            activities,
            enrollments,
        }
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

fn owner(id: &str, name: &str, role: Role, title: Option<&str>) -> OwnerData {
    let email = format!(
        "{}@harbor-summit.example",
        name.to_lowercase().replace(' ', ".")
    );
    OwnerData {
        owner_id: OwnerId::new(id),
        full_name: name.to_string(),
        email,
        role,
        title: title.map(str::to_string),
    }
}

fn enrollment(
    id: &str,
    owner: &str,
    activity: &str,
    attendance: f64,
    minutes: u32,
) -> EnrollmentRecord {
    EnrollmentRecord {
        enrollment_id: EnrollmentId::new(id),
        owner_id: OwnerId::new(owner),
        activity_id: ActivityId::new(activity),
        attendance_percent: attendance,
        participation_minutes: minutes,
    }
}

// ── Collaborator implementations ─────────────────────────────────────────────

impl OwnerDirectory for EventDirectory {
    fn owner(&self, owner_id: &OwnerId) -> CertResult<Option<OwnerData>> {
        Ok(self.owners.get(owner_id).cloned())
    }
}

impl ActivityDirectory for EventDirectory {
    fn activity(&self, activity_id: &ActivityId) -> CertResult<Option<ActivityInfo>> {
        Ok(self.activities.get(activity_id).cloned())
    }
}

impl ParticipationRecords for EventDirectory {
    fn enrollment(
        &self,
        owner_id: &OwnerId,
        activity_id: &ActivityId,
    ) -> CertResult<Option<EnrollmentRecord>> {
        Ok(self
            .enrollments
            .iter()
            .find(|e| &e.owner_id == owner_id && &e.activity_id == activity_id)
            .cloned())
    }
}
