use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertPriority, AlertType};
use crate::sobriety::CheckInStatus;

/// Every state change in the system produces an Event.
/// Front ends drain them after each operation and surface them to staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    AlertCreated {
        alert_id: String,
        client_id: String,
        alert_type: AlertType,
        priority: AlertPriority,
        due_date: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AlertUpdated {
        alert_id: String,
        at: DateTime<Utc>,
    },
    AlertResolved {
        alert_id: String,
        resolved_by: String,
        at: DateTime<Utc>,
    },
    AlertSnoozed {
        alert_id: String,
        until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// `automatic` is true when the snooze sweep woke the alert.
    AlertReactivated {
        alert_id: String,
        automatic: bool,
        at: DateTime<Utc>,
    },
    AlertDeleted {
        alert_id: String,
        at: DateTime<Utc>,
    },
    CheckInRecorded {
        client_id: String,
        check_in_id: String,
        status: CheckInStatus,
        current_streak: u32,
        at: DateTime<Utc>,
    },
    MilestoneAchieved {
        client_id: String,
        days: u32,
        at: DateTime<Utc>,
    },
}

/// How loudly a notification should be shown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

/// A transient message for staff (toast in a GUI, a line in the CLI).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::AlertCreated { at, .. }
            | Event::AlertUpdated { at, .. }
            | Event::AlertResolved { at, .. }
            | Event::AlertSnoozed { at, .. }
            | Event::AlertReactivated { at, .. }
            | Event::AlertDeleted { at, .. }
            | Event::CheckInRecorded { at, .. }
            | Event::MilestoneAchieved { at, .. } => *at,
        }
    }

    pub fn notification(&self) -> Notification {
        let (title, description, severity) = match self {
            Event::AlertCreated {
                alert_id,
                alert_type,
                priority,
                due_date,
                ..
            } => (
                "Alert created",
                format!(
                    "{} {} alert {} due {}",
                    priority.as_str(),
                    alert_type.as_str(),
                    alert_id,
                    due_date.format("%Y-%m-%d %H:%M")
                ),
                Severity::Info,
            ),
            Event::AlertUpdated { alert_id, .. } => {
                ("Alert updated", format!("Alert {alert_id} updated"), Severity::Info)
            }
            Event::AlertResolved {
                alert_id,
                resolved_by,
                ..
            } => (
                "Alert resolved",
                format!("Alert {alert_id} resolved by {resolved_by}"),
                Severity::Success,
            ),
            Event::AlertSnoozed { alert_id, until, .. } => (
                "Alert snoozed",
                format!("Alert {alert_id} snoozed until {}", until.format("%Y-%m-%d %H:%M")),
                Severity::Info,
            ),
            Event::AlertReactivated {
                alert_id,
                automatic,
                ..
            } => (
                "Alert reactivated",
                if *automatic {
                    format!("Snooze expired for alert {alert_id}")
                } else {
                    format!("Alert {alert_id} reactivated")
                },
                Severity::Warning,
            ),
            Event::AlertDeleted { alert_id, .. } => {
                ("Alert deleted", format!("Alert {alert_id} deleted"), Severity::Info)
            }
            Event::CheckInRecorded {
                status,
                current_streak,
                ..
            } => match status {
                CheckInStatus::Sober => (
                    "Check-in recorded",
                    format!("Current streak: {current_streak}"),
                    Severity::Success,
                ),
                CheckInStatus::Relapse => (
                    "Relapse recorded",
                    "Streak reset to 0".to_string(),
                    Severity::Warning,
                ),
            },
            Event::MilestoneAchieved { days, .. } => (
                "Milestone achieved",
                format!("{days} days sober"),
                Severity::Success,
            ),
        };
        Notification {
            title: title.to_string(),
            description,
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::AlertDeleted {
            alert_id: "a-1".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AlertDeleted");
        assert_eq!(json["alert_id"], "a-1");
    }

    #[test]
    fn relapse_notification_is_a_warning() {
        let event = Event::CheckInRecorded {
            client_id: "c".to_string(),
            check_in_id: "l".to_string(),
            status: CheckInStatus::Relapse,
            current_streak: 0,
            at: Utc::now(),
        };
        let note = event.notification();
        assert_eq!(note.severity, Severity::Warning);
        assert_eq!(note.title, "Relapse recorded");
    }

    #[test]
    fn automatic_reactivation_mentions_snooze() {
        let event = Event::AlertReactivated {
            alert_id: "a-2".to_string(),
            automatic: true,
            at: Utc::now(),
        };
        assert!(event.notification().description.contains("Snooze expired"));
    }

    #[test]
    fn at_reports_the_event_instant() {
        let when = Utc::now() - chrono::Duration::minutes(5);
        let event = Event::MilestoneAchieved {
            client_id: "c".to_string(),
            days: 30,
            at: when,
        };
        assert_eq!(event.at(), when);
    }
}
