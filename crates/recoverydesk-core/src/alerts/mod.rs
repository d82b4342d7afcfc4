//! Alert records and their lifecycle.
//!
//! An alert is an action item tied to a client. Its status follows a small
//! state machine:
//!
//!   ACTIVE ──snooze──> SNOOZED ──reactivate / sweep──> ACTIVE
//!     |                   |
//!     +──resolve──> RESOLVED <──resolve──+
//!
//! RESOLVED is terminal. Snoozing an already snoozed alert moves its wake-up
//! time. Edits never touch the status.

pub mod manager;
pub mod rules;
pub mod sweeper;

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use manager::AlertManager;
pub use rules::{ReminderRules, RuleCandidate};
pub use sweeper::SnoozeSweeper;

/// What an alert is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Medication,
    Appointment,
    Documentation,
    Legal,
    Insurance,
    Custom,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Medication => "medication",
            AlertType::Appointment => "appointment",
            AlertType::Documentation => "documentation",
            AlertType::Legal => "legal",
            AlertType::Insurance => "insurance",
            AlertType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "medication" => Some(AlertType::Medication),
            "appointment" => Some(AlertType::Appointment),
            "documentation" => Some(AlertType::Documentation),
            "legal" => Some(AlertType::Legal),
            "insurance" => Some(AlertType::Insurance),
            "custom" => Some(AlertType::Custom),
            _ => None,
        }
    }
}

/// Alert priority.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    /// Dashboard rank: lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            AlertPriority::Urgent => 0,
            AlertPriority::High => 1,
            AlertPriority::Medium => 2,
            AlertPriority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(AlertPriority::Low),
            "medium" => Some(AlertPriority::Medium),
            "high" => Some(AlertPriority::High),
            "urgent" => Some(AlertPriority::Urgent),
            _ => None,
        }
    }
}

/// Alert status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Requires attention (initial state)
    #[default]
    Active,
    /// Suppressed until `snooze_until`
    Snoozed,
    /// Closed (terminal state)
    Resolved,
}

impl AlertStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &AlertStatus) -> bool {
        match self {
            AlertStatus::Active => matches!(to, AlertStatus::Snoozed | AlertStatus::Resolved),
            AlertStatus::Snoozed => matches!(
                to,
                AlertStatus::Active | AlertStatus::Snoozed | AlertStatus::Resolved
            ),
            AlertStatus::Resolved => false,
        }
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &[AlertStatus] {
        match self {
            AlertStatus::Active => &[AlertStatus::Snoozed, AlertStatus::Resolved],
            AlertStatus::Snoozed => &[
                AlertStatus::Active,
                AlertStatus::Snoozed,
                AlertStatus::Resolved,
            ],
            AlertStatus::Resolved => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Snoozed => "snoozed",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AlertStatus::Active),
            "snoozed" => Some(AlertStatus::Snoozed),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action item tied to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub client_id: String,
    /// Denormalized client display name
    pub client_name: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: AlertStatus,
    /// Set only while snoozed
    pub snooze_until: Option<DateTime<Utc>>,
    /// Set only once resolved
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    /// Originating record, for deep links
    pub related_id: Option<String>,
    pub related_type: Option<String>,
    pub related_url: Option<String>,
    /// Bumped by every stored write; conditional updates compare it
    #[serde(default)]
    pub version: u32,
}

impl Alert {
    /// Build a fresh active alert from creation data.
    pub fn from_new(data: NewAlert, now: DateTime<Utc>) -> Self {
        Alert {
            id: Uuid::new_v4().to_string(),
            alert_type: data.alert_type,
            priority: data.priority,
            client_id: data.client_id,
            client_name: data.client_name,
            title: data.title,
            description: data.description,
            created_at: now,
            due_date: data.due_date,
            status: AlertStatus::Active,
            snooze_until: None,
            resolved_at: None,
            resolved_by: None,
            related_id: data.related_id,
            related_type: data.related_type,
            related_url: data.related_url,
            version: 0,
        }
    }

    /// Close the alert.
    pub fn resolve(
        &mut self,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AlertTransitionError> {
        self.check_transition(AlertStatus::Resolved)?;
        self.status = AlertStatus::Resolved;
        self.snooze_until = None;
        self.resolved_at = Some(now);
        self.resolved_by = Some(resolved_by.to_string());
        Ok(())
    }

    /// Suppress the alert until `until`. The caller checks `until` is in the future.
    pub fn snooze(&mut self, until: DateTime<Utc>) -> Result<(), AlertTransitionError> {
        self.check_transition(AlertStatus::Snoozed)?;
        self.status = AlertStatus::Snoozed;
        self.snooze_until = Some(until);
        Ok(())
    }

    /// Bring a snoozed alert back.
    pub fn reactivate(&mut self) -> Result<(), AlertTransitionError> {
        self.check_transition(AlertStatus::Active)?;
        self.status = AlertStatus::Active;
        self.snooze_until = None;
        Ok(())
    }

    /// Whether the sweep should wake this alert at `now`.
    pub fn snooze_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == AlertStatus::Snoozed
            && self.snooze_until.map_or(true, |until| until < now)
    }

    /// Apply a partial edit. Status and lifecycle timestamps are untouched.
    pub fn apply_patch(&mut self, patch: AlertPatch) {
        if let Some(t) = patch.alert_type {
            self.alert_type = t;
        }
        if let Some(p) = patch.priority {
            self.priority = p;
        }
        if let Some(t) = patch.title {
            self.title = t;
        }
        if let Some(d) = patch.description {
            self.description = Some(d);
        }
        if let Some(d) = patch.due_date {
            self.due_date = d;
        }
        if let Some(name) = patch.client_name {
            self.client_name = name;
        }
        if let Some(id) = patch.related_id {
            self.related_id = Some(id);
        }
        if let Some(t) = patch.related_type {
            self.related_type = Some(t);
        }
        if let Some(url) = patch.related_url {
            self.related_url = Some(url);
        }
    }

    fn check_transition(&self, to: AlertStatus) -> Result<(), AlertTransitionError> {
        if self.status.can_transition_to(&to) {
            Ok(())
        } else {
            Err(AlertTransitionError {
                id: self.id.clone(),
                from: self.status,
                to,
            })
        }
    }
}

/// Data supplied when creating an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub alert_type: AlertType,
    #[serde(default)]
    pub priority: AlertPriority,
    pub client_id: String,
    pub client_name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub related_type: Option<String>,
    #[serde(default)]
    pub related_url: Option<String>,
}

/// Partial update for an alert. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertPatch {
    pub alert_type: Option<AlertType>,
    pub priority: Option<AlertPriority>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub client_name: Option<String>,
    pub related_id: Option<String>,
    pub related_type: Option<String>,
    pub related_url: Option<String>,
}

impl AlertPatch {
    pub fn is_empty(&self) -> bool {
        self.alert_type.is_none()
            && self.priority.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.client_name.is_none()
            && self.related_id.is_none()
            && self.related_type.is_none()
            && self.related_url.is_none()
    }
}

/// Error returned when an invalid state transition is attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertTransitionError {
    pub id: String,
    pub from: AlertStatus,
    pub to: AlertStatus,
}

impl fmt::Display for AlertTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid alert transition for {}: {} → {}",
            self.id, self.from, self.to
        )
    }
}

impl std::error::Error for AlertTransitionError {}

/// `start` plus `days` whole days, or `None` when that is not a
/// representable instant.
pub fn days_after(start: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|delta| start.checked_add_signed(delta))
}

/// Dashboard ordering: priority rank ascending, then earliest due date.
pub fn dashboard_order(a: &Alert, b: &Alert) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| a.due_date.cmp(&b.due_date))
}

/// Sort alerts in place for display. Ordering is the caller's concern;
/// the manager returns collection order.
pub fn sort_for_dashboard(alerts: &mut [Alert]) {
    alerts.sort_by(dashboard_order);
}


#[cfg(test)]
mod tests {
    use super::test_support::new_alert;
    use super::*;

    #[test]
    fn resolved_is_terminal() {
        assert!(AlertStatus::Resolved.valid_transitions().is_empty());
        for to in [AlertStatus::Active, AlertStatus::Snoozed, AlertStatus::Resolved] {
            assert!(!AlertStatus::Resolved.can_transition_to(&to));
        }
    }

    #[test]
    fn active_cannot_reactivate() {
        assert!(!AlertStatus::Active.can_transition_to(&AlertStatus::Active));
    }

    #[test]
    fn resolve_sets_and_clears_fields() {
        let now = Utc::now();
        let mut alert = Alert::from_new(new_alert(AlertPriority::High, now), now);
        alert.snooze(now + Duration::hours(1)).unwrap();
        alert.resolve("case-manager", now).unwrap();

        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.resolved_at, Some(now));
        assert_eq!(alert.resolved_by.as_deref(), Some("case-manager"));
        assert!(alert.snooze_until.is_none());
    }

    #[test]
    fn double_resolve_is_rejected() {
        let now = Utc::now();
        let mut alert = Alert::from_new(new_alert(AlertPriority::Low, now), now);
        alert.resolve("a", now).unwrap();
        let err = alert.resolve("b", now).unwrap_err();
        assert_eq!(err.from, AlertStatus::Resolved);
        assert_eq!(err.to, AlertStatus::Resolved);
        assert_eq!(alert.resolved_by.as_deref(), Some("a"));
    }

    #[test]
    fn patch_leaves_status_alone() {
        let now = Utc::now();
        let mut alert = Alert::from_new(new_alert(AlertPriority::Low, now), now);
        alert.snooze(now + Duration::days(1)).unwrap();
        alert.apply_patch(AlertPatch {
            priority: Some(AlertPriority::Urgent),
            title: Some("Call probation officer".to_string()),
            ..Default::default()
        });

        assert_eq!(alert.status, AlertStatus::Snoozed);
        assert_eq!(alert.priority, AlertPriority::Urgent);
        assert_eq!(alert.title, "Call probation officer");
    }

    #[test]
    fn dashboard_sort_by_rank_then_due() {
        let now = Utc::now();
        let mut alerts = vec![
            Alert::from_new(new_alert(AlertPriority::Low, now), now),
            Alert::from_new(new_alert(AlertPriority::Urgent, now + Duration::days(2)), now),
            Alert::from_new(new_alert(AlertPriority::Urgent, now + Duration::days(1)), now),
            Alert::from_new(new_alert(AlertPriority::High, now), now),
        ];
        sort_for_dashboard(&mut alerts);

        let order: Vec<_> = alerts.iter().map(|a| (a.priority, a.due_date)).collect();
        assert_eq!(
            order,
            vec![
                (AlertPriority::Urgent, now + Duration::days(1)),
                (AlertPriority::Urgent, now + Duration::days(2)),
                (AlertPriority::High, now),
                (AlertPriority::Low, now),
            ]
        );
    }

    #[test]
    fn days_after_reports_overflow() {
        let now = Utc::now();
        assert_eq!(days_after(now, 2), Some(now + Duration::days(2)));
        assert_eq!(days_after(now, i64::MAX), None);
        assert_eq!(days_after(now, i64::from(u32::MAX)), None);
    }

    #[test]
    fn defaults_are_medium_and_active() {
        assert_eq!(AlertPriority::default(), AlertPriority::Medium);
        assert_eq!(AlertStatus::default(), AlertStatus::Active);
        let now = Utc::now();
        assert_eq!(Alert::from_new(new_alert(AlertPriority::Low, now), now).version, 0);
    }

    #[test]
    fn enum_strings_round_trip() {
        for t in [
            AlertType::Medication,
            AlertType::Appointment,
            AlertType::Documentation,
            AlertType::Legal,
            AlertType::Insurance,
            AlertType::Custom,
        ] {
            assert_eq!(AlertType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AlertPriority::parse("urgent"), Some(AlertPriority::Urgent));
        assert_eq!(AlertStatus::parse("snoozed"), Some(AlertStatus::Snoozed));
        assert_eq!(AlertStatus::parse("closed"), None);
    }
}
