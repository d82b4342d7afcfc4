//! Streak arithmetic.
//!
//! Pure functions over a client's cached [`StreakState`]; nothing here touches
//! storage. [`SobrietyService`](super::SobrietyService) persists the results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    CheckInStatus, NewCheckIn, SobrietyCheckIn, SobrietyMilestone, StreakState, MILESTONE_DAYS,
};

const DAYS_PER_YEAR: u32 = 365;

/// Everything a single check-in changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInOutcome {
    /// Log entry to append
    pub entry: SobrietyCheckIn,
    /// Streak state to write back onto the client
    pub state: StreakState,
    /// Set when this check-in first reaches a milestone
    pub milestone: Option<SobrietyMilestone>,
}

/// Apply one check-in to `state`.
///
/// `milestones` are the client's already recorded milestones; a milestone is
/// only produced when none exists for the same streak length.
pub fn record_check_in(
    client_id: &str,
    state: &StreakState,
    milestones: &[SobrietyMilestone],
    entry: NewCheckIn,
    now: DateTime<Utc>,
) -> CheckInOutcome {
    let check_in_date = entry.check_in_date.unwrap_or(now);
    let mut next = state.clone();
    let mut milestone = None;

    match entry.status {
        CheckInStatus::Sober => {
            next.current_streak = state.current_streak.saturating_add(1);
            next.longest_streak = state.longest_streak.max(next.current_streak);

            let days = next.current_streak;
            let already_recorded = milestones
                .iter()
                .any(|m| m.client_id == client_id && m.days == days);
            if MILESTONE_DAYS.contains(&days) && !already_recorded {
                milestone = Some(SobrietyMilestone {
                    id: Uuid::new_v4().to_string(),
                    client_id: client_id.to_string(),
                    days,
                    achieved_date: now,
                    notes: None,
                });
            }
        }
        CheckInStatus::Relapse => {
            next.current_streak = 0;
            next.last_relapse_date = Some(check_in_date);
            next.relapse_count = state.relapse_count.saturating_add(1);
        }
    }

    CheckInOutcome {
        entry: SobrietyCheckIn {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            status: entry.status,
            check_in_date,
            notes: entry.notes,
        },
        state: next,
        milestone,
    }
}

/// Smallest milestone strictly above `current_streak`.
///
/// Past the last fixed milestone, the next whole multiple of a year,
/// saturating at `u32::MAX`.
pub fn next_milestone(current_streak: u32) -> u32 {
    MILESTONE_DAYS
        .iter()
        .copied()
        .find(|&days| days > current_streak)
        .unwrap_or_else(|| {
            (current_streak / DAYS_PER_YEAR + 1)
                .checked_mul(DAYS_PER_YEAR)
                .unwrap_or(u32::MAX)
        })
}

/// Whole days between program entry and `now`; 0 when unknown or in the future.
pub fn days_since_program_entry(entry_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match entry_date {
        Some(entry) => (now - entry).num_days().max(0),
        None => 0,
    }
}

/// Read-only view of a client's progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreakSummary {
    pub client_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub relapse_count: u32,
    pub last_relapse_date: Option<DateTime<Utc>>,
    pub next_milestone: u32,
    /// Sober check-ins still needed to reach `next_milestone`
    pub check_ins_to_next_milestone: u32,
    pub days_in_program: i64,
    pub milestones_achieved: Vec<u32>,
}

pub fn streak_summary(
    client_id: &str,
    state: &StreakState,
    program_entry_date: Option<DateTime<Utc>>,
    milestones: &[SobrietyMilestone],
    now: DateTime<Utc>,
) -> StreakSummary {
    let next = next_milestone(state.current_streak);
    let mut achieved: Vec<u32> = milestones.iter().map(|m| m.days).collect();
    achieved.sort_unstable();
    achieved.dedup();

    StreakSummary {
        client_id: client_id.to_string(),
        current_streak: state.current_streak,
        longest_streak: state.longest_streak,
        relapse_count: state.relapse_count,
        last_relapse_date: state.last_relapse_date,
        next_milestone: next,
        check_ins_to_next_milestone: next.saturating_sub(state.current_streak),
        days_in_program: days_since_program_entry(program_entry_date, now),
        milestones_achieved: achieved,
    }
}
