//! Sobriety commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use recoverydesk_core::{CheckInStatus, Database, NewCheckIn, SobrietyService};

use super::{parse_check_in_status, parse_when, print_events, print_json};

#[derive(Subcommand)]
pub enum SobrietyAction {
    /// Record a check-in
    CheckIn {
        /// Client ID
        client: String,
        /// sober or relapse
        #[arg(long, default_value = "sober", value_parser = parse_check_in_status)]
        status: CheckInStatus,
        /// Check-in date (default: now)
        #[arg(long, value_parser = parse_when)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show a client's check-in log, oldest first
    Log {
        /// Client ID
        client: String,
    },
    /// Replace the notes on a logged check-in
    EditNotes {
        /// Check-in ID
        id: String,
        /// New notes; omit to clear
        notes: Option<String>,
    },
    /// List a client's milestones
    Milestones {
        /// Client ID
        client: String,
    },
    /// Current streak, longest streak and next milestone
    Summary {
        /// Client ID
        client: String,
    },
}

pub fn run(action: SobrietyAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = SobrietyService::new(Database::open()?);

    match action {
        SobrietyAction::CheckIn {
            client,
            status,
            date,
            notes,
        } => {
            let outcome = service.record_check_in(
                &client,
                NewCheckIn {
                    status,
                    check_in_date: date,
                    notes,
                },
            )?;
            print_json(&serde_json::json!({
                "check_in": outcome.entry,
                "streak": outcome.state,
                "milestone": outcome.milestone,
            }))?;
        }
        SobrietyAction::Log { client } => {
            print_json(&service.list_check_ins(&client)?)?;
        }
        SobrietyAction::EditNotes { id, notes } => {
            print_json(&service.update_check_in_notes(&id, notes.as_deref())?)?;
        }
        SobrietyAction::Milestones { client } => {
            print_json(&service.list_milestones(&client)?)?;
        }
        SobrietyAction::Summary { client } => {
            print_json(&service.streak_summary(&client)?)?;
        }
    }

    print_events(&service.drain_events());
    Ok(())
}
