//! Reminder rules: turn dated client facts into alert candidates.
//!
//! Rules are pure. [`ReminderRules::evaluate`] looks at one client at one
//! instant and returns what should exist; the manager decides what is new.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{days_after, AlertPriority, AlertType, NewAlert};
use crate::clients::{Client, ClientFact};
use crate::storage::RulesConfig;

/// `related_type` stamped on every rule-generated alert.
pub const RULE_RELATED_TYPE: &str = "client_fact";

/// When a rule fires relative to its fact's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    /// Date falls within `lead_days` from now. Past dates fire only when
    /// `overdue` is set.
    Upcoming { lead_days: u32, overdue: bool },
    /// Date is more than `gap_days` in the past.
    Stale { gap_days: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRule {
    pub fact: ClientFact,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub window: Window,
}

/// An alert a rule wants to exist.
#[derive(Debug, Clone)]
pub struct RuleCandidate {
    pub fact: ClientFact,
    pub alert: NewAlert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRules {
    pub rules: Vec<ReminderRule>,
}

impl Default for ReminderRules {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

impl ReminderRules {
    pub fn from_config(config: &RulesConfig) -> Self {
        let rules = vec![
            ReminderRule {
                fact: ClientFact::CourtDate,
                alert_type: AlertType::Legal,
                priority: AlertPriority::Urgent,
                window: Window::Upcoming {
                    lead_days: config.court_lead_days,
                    overdue: false,
                },
            },
            ReminderRule {
                fact: ClientFact::InsuranceExpires,
                alert_type: AlertType::Insurance,
                priority: AlertPriority::High,
                window: Window::Upcoming {
                    lead_days: config.insurance_lead_days,
                    overdue: true,
                },
            },
            ReminderRule {
                fact: ClientFact::MedicationRefill,
                alert_type: AlertType::Medication,
                priority: AlertPriority::High,
                window: Window::Upcoming {
                    lead_days: config.medication_lead_days,
                    overdue: true,
                },
            },
            ReminderRule {
                fact: ClientFact::NextAppointment,
                alert_type: AlertType::Appointment,
                priority: AlertPriority::Medium,
                window: Window::Upcoming {
                    lead_days: config.appointment_lead_days,
                    overdue: false,
                },
            },
            ReminderRule {
                fact: ClientFact::LastProgressNote,
                alert_type: AlertType::Documentation,
                priority: AlertPriority::Medium,
                window: Window::Stale {
                    gap_days: config.documentation_gap_days,
                },
            },
        ];
        Self { rules }
    }

    /// Candidates for one client at `now`, in rule order.
    pub fn evaluate(&self, client: &Client, now: DateTime<Utc>) -> Vec<RuleCandidate> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(client, now))
            .collect()
    }
}

impl ReminderRule {
    fn evaluate(&self, client: &Client, now: DateTime<Utc>) -> Option<RuleCandidate> {
        let fact_date = client.fact(self.fact);

        let (anchor, due_date) = match self.window {
            Window::Upcoming { lead_days, overdue } => {
                let date = fact_date?;
                // A lead window past the end of time has no upper bound.
                let beyond_horizon =
                    days_after(now, i64::from(lead_days)).is_some_and(|horizon| date > horizon);
                if beyond_horizon || (date < now && !overdue) {
                    return None;
                }
                (Some(date), date)
            }
            Window::Stale { gap_days } => {
                // No note yet: measure the gap from program entry instead.
                let since = fact_date.or(client.program_entry_date)?;
                // A gap that overflows never elapses.
                let due = days_after(since, i64::from(gap_days))?;
                if due >= now {
                    return None;
                }
                (fact_date, due)
            }
        };

        let name = client.display_name();
        Some(RuleCandidate {
            fact: self.fact,
            alert: NewAlert {
                alert_type: self.alert_type,
                priority: self.priority,
                client_id: client.id.clone(),
                client_name: name.clone(),
                title: format!("{} for {name}", title_for(self.fact)),
                description: Some(describe(self.fact, anchor)),
                due_date,
                related_id: Some(origin_id(self.fact, anchor)),
                related_type: Some(RULE_RELATED_TYPE.to_string()),
                related_url: None,
            },
        })
    }
}

/// Origin key: the fact name and the date it fired on.
pub fn origin_id(fact: ClientFact, date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => format!("{}:{}", fact.as_str(), d.format("%Y-%m-%d")),
        None => format!("{}:none", fact.as_str()),
    }
}

fn title_for(fact: ClientFact) -> &'static str {
    match fact {
        ClientFact::CourtDate => "Upcoming court date",
        ClientFact::InsuranceExpires => "Insurance expiring",
        ClientFact::MedicationRefill => "Medication refill due",
        ClientFact::NextAppointment => "Upcoming appointment",
        ClientFact::LastProgressNote => "Progress note overdue",
    }
}

fn describe(fact: ClientFact, date: Option<DateTime<Utc>>) -> String {
    let day = date.map(|d| d.format("%Y-%m-%d").to_string());
    match (fact, day) {
        (ClientFact::LastProgressNote, Some(d)) => format!("Last progress note written {d}"),
        (ClientFact::LastProgressNote, None) => "No progress note on file".to_string(),
        (_, Some(d)) => format!("{} on {d}", fact.as_str()),
        (_, None) => fact.as_str().to_string(),
    }
}
