//! Client commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use recoverydesk_core::{ClientFact, Database, SobrietyService};

use super::{parse_when, print_json};

#[derive(Subcommand)]
pub enum ClientsAction {
    /// Add a client
    Add {
        first_name: String,
        last_name: String,
        /// Program entry date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_when)]
        entry_date: Option<DateTime<Utc>>,
    },
    /// List clients
    List,
    /// Show one client
    Show {
        /// Client ID
        id: String,
    },
    /// Set or clear a dated fact used by reminder rules
    SetFact {
        /// Client ID
        id: String,
        /// court, insurance, medication, appointment, progress_note (or the field name)
        #[arg(value_parser = parse_fact)]
        fact: ClientFact,
        /// New date; omit to clear the fact
        #[arg(value_parser = parse_when)]
        date: Option<DateTime<Utc>>,
    },
}

fn parse_fact(s: &str) -> Result<ClientFact, String> {
    ClientFact::parse(s).ok_or_else(|| format!("unknown client fact '{s}'"))
}

pub fn run(action: ClientsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = SobrietyService::new(Database::open()?);

    match action {
        ClientsAction::Add {
            first_name,
            last_name,
            entry_date,
        } => {
            let client = service.add_client(&first_name, &last_name, entry_date)?;
            print_json(&client)?;
        }
        ClientsAction::List => {
            print_json(&service.list_clients()?)?;
        }
        ClientsAction::Show { id } => {
            print_json(&service.get_client(&id)?)?;
        }
        ClientsAction::SetFact { id, fact, date } => {
            print_json(&service.set_client_fact(&id, fact, date)?)?;
        }
    }
    Ok(())
}
