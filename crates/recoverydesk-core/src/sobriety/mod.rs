//! Sobriety check-ins, streaks and milestones.
//!
//! A streak counts consecutive sober check-ins, not calendar days: a client
//! checking in once a week gains one per check-in. A relapse check-in resets
//! the current streak to zero and bumps the relapse count.

mod service;
mod streak;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use service::SobrietyService;
pub use streak::{
    days_since_program_entry, next_milestone, record_check_in, streak_summary, CheckInOutcome,
    StreakSummary,
};

/// Streak lengths whose first achievement is recorded.
pub const MILESTONE_DAYS: [u32; 7] = [30, 60, 90, 180, 365, 730, 1095];

/// Outcome reported at a check-in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Sober,
    Relapse,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Sober => "sober",
            CheckInStatus::Relapse => "relapse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sober" => Some(CheckInStatus::Sober),
            "relapse" => Some(CheckInStatus::Relapse),
            _ => None,
        }
    }
}

/// One entry of a client's check-in log. Only `notes` may change later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SobrietyCheckIn {
    pub id: String,
    pub client_id: String,
    pub status: CheckInStatus,
    pub check_in_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Check-in as submitted by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckIn {
    pub status: CheckInStatus,
    /// Defaults to the time of recording
    #[serde(default)]
    pub check_in_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewCheckIn {
    pub fn sober() -> Self {
        NewCheckIn {
            status: CheckInStatus::Sober,
            check_in_date: None,
            notes: None,
        }
    }

    pub fn relapse(on: DateTime<Utc>) -> Self {
        NewCheckIn {
            status: CheckInStatus::Relapse,
            check_in_date: Some(on),
            notes: None,
        }
    }
}

/// Streak fields cached on the client record.
///
/// `longest_streak >= current_streak` holds after every check-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_relapse_date: Option<DateTime<Utc>>,
    pub relapse_count: u32,
}

/// First achievement of a milestone streak length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SobrietyMilestone {
    pub id: String,
    pub client_id: String,
    pub days: u32,
    pub achieved_date: DateTime<Utc>,
    pub notes: Option<String>,
}
