//! Client records.
//!
//! Only the parts of a client the core logic reads are modelled here: the
//! name shown on alerts, the program entry date, the cached streak state and
//! the dated facts the reminder rules watch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sobriety::StreakState;

/// A program participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub program_entry_date: Option<DateTime<Utc>>,
    /// Derived from the check-in log; rewritten on every check-in
    #[serde(flatten)]
    pub streak: StreakState,
    pub next_appointment_at: Option<DateTime<Utc>>,
    pub insurance_expires_at: Option<DateTime<Utc>>,
    pub next_court_date: Option<DateTime<Utc>>,
    pub last_progress_note_at: Option<DateTime<Utc>>,
    pub medication_refill_due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Client {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            program_entry_date: None,
            streak: StreakState::default(),
            next_appointment_at: None,
            insurance_expires_at: None,
            next_court_date: None,
            last_progress_note_at: None,
            medication_refill_due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name shown on alerts and in listings.
    pub fn display_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", last) => last.to_string(),
            (first, "") => first.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    pub fn fact(&self, fact: ClientFact) -> Option<DateTime<Utc>> {
        match fact {
            ClientFact::NextAppointment => self.next_appointment_at,
            ClientFact::InsuranceExpires => self.insurance_expires_at,
            ClientFact::CourtDate => self.next_court_date,
            ClientFact::LastProgressNote => self.last_progress_note_at,
            ClientFact::MedicationRefill => self.medication_refill_due_at,
        }
    }

    pub fn set_fact(&mut self, fact: ClientFact, value: Option<DateTime<Utc>>) {
        let slot = match fact {
            ClientFact::NextAppointment => &mut self.next_appointment_at,
            ClientFact::InsuranceExpires => &mut self.insurance_expires_at,
            ClientFact::CourtDate => &mut self.next_court_date,
            ClientFact::LastProgressNote => &mut self.last_progress_note_at,
            ClientFact::MedicationRefill => &mut self.medication_refill_due_at,
        };
        *slot = value;
        self.updated_at = Utc::now();
    }
}

/// A dated fact about a client that reminder rules can fire on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClientFact {
    NextAppointment,
    InsuranceExpires,
    CourtDate,
    LastProgressNote,
    MedicationRefill,
}

impl ClientFact {
    pub const ALL: [ClientFact; 5] = [
        ClientFact::CourtDate,
        ClientFact::InsuranceExpires,
        ClientFact::MedicationRefill,
        ClientFact::NextAppointment,
        ClientFact::LastProgressNote,
    ];

    /// Column / field name of the fact.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientFact::NextAppointment => "next_appointment_at",
            ClientFact::InsuranceExpires => "insurance_expires_at",
            ClientFact::CourtDate => "next_court_date",
            ClientFact::LastProgressNote => "last_progress_note_at",
            ClientFact::MedicationRefill => "medication_refill_due_at",
        }
    }

    /// Accepts the field name or a short alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "next_appointment_at" | "appointment" => Some(ClientFact::NextAppointment),
            "insurance_expires_at" | "insurance" => Some(ClientFact::InsuranceExpires),
            "next_court_date" | "court" => Some(ClientFact::CourtDate),
            "last_progress_note_at" | "progress_note" => Some(ClientFact::LastProgressNote),
            "medication_refill_due_at" | "medication" => Some(ClientFact::MedicationRefill),
            _ => None,
        }
    }
}
