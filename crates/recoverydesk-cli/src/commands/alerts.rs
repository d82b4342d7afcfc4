//! Alert commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use recoverydesk_core::storage::{AlertRepository, ClientRepository};
use recoverydesk_core::{
    sort_for_dashboard, AlertManager, AlertPatch, AlertPriority, AlertStatus, AlertType, Config,
    CoreError, Database, NewAlert, ReminderRules, SnoozeSweeper,
};

use super::{parse_alert_type, parse_priority, parse_status, parse_when, print_events, print_json};

#[derive(Subcommand)]
pub enum AlertsAction {
    /// Create an alert for a client
    Create {
        /// Client ID
        #[arg(long)]
        client: String,
        /// Alert title
        #[arg(long)]
        title: String,
        /// medication, appointment, documentation, legal, insurance or custom
        #[arg(long = "type", default_value = "custom", value_parser = parse_alert_type)]
        alert_type: AlertType,
        /// low, medium, high or urgent
        #[arg(long, default_value = "medium", value_parser = parse_priority)]
        priority: AlertPriority,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_when)]
        due: DateTime<Utc>,
        #[arg(long)]
        description: Option<String>,
        /// ID of the originating record
        #[arg(long)]
        related_id: Option<String>,
        #[arg(long)]
        related_type: Option<String>,
        #[arg(long)]
        related_url: Option<String>,
    },
    /// List alerts
    List {
        /// Filter by status
        #[arg(long, value_parser = parse_status)]
        status: Option<AlertStatus>,
        /// Filter by priority
        #[arg(long, value_parser = parse_priority)]
        priority: Option<AlertPriority>,
        /// Filter by client ID
        #[arg(long)]
        client: Option<String>,
        /// Sort by priority, then due date
        #[arg(long)]
        dashboard: bool,
    },
    /// Active alerts due within a number of days
    Due {
        /// Window in days (default: alerts.due_window_days)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Show one alert
    Show {
        /// Alert ID
        id: String,
    },
    /// Edit alert fields; status is never changed
    Edit {
        /// Alert ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type", value_parser = parse_alert_type)]
        alert_type: Option<AlertType>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<AlertPriority>,
        #[arg(long, value_parser = parse_when)]
        due: Option<DateTime<Utc>>,
    },
    /// Resolve an alert
    Resolve {
        /// Alert ID
        id: String,
        /// Who resolved it
        #[arg(long)]
        by: String,
    },
    /// Snooze an alert
    Snooze {
        /// Alert ID
        id: String,
        /// Wake-up time (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_when, conflicts_with = "days")]
        until: Option<DateTime<Utc>>,
        /// Snooze for this many days (default: alerts.default_snooze_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Bring a snoozed alert back
    Reactivate {
        /// Alert ID
        id: String,
    },
    /// Delete an alert
    Delete {
        /// Alert ID
        id: String,
    },
    /// Reactivate alerts whose snooze has expired
    Sweep,
    /// Run the snooze sweep periodically until Ctrl-C
    Watch {
        /// Seconds between sweeps (default: alerts.sweep_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Create alerts from client facts (court dates, insurance, refills)
    EvaluateRules {
        /// Print candidates without creating alerts
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(action: AlertsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut manager = AlertManager::new(Database::open()?);

    match action {
        AlertsAction::Create {
            client,
            title,
            alert_type,
            priority,
            due,
            description,
            related_id,
            related_type,
            related_url,
        } => {
            let client = manager
                .repository()
                .get_client(&client)?
                .ok_or_else(|| CoreError::client_not_found(&client))?;
            let alert = manager.create_alert(NewAlert {
                alert_type,
                priority,
                client_id: client.id.clone(),
                client_name: client.display_name(),
                title,
                description,
                due_date: due,
                related_id,
                related_type,
                related_url,
            })?;
            print_json(&alert)?;
        }
        AlertsAction::List {
            status,
            priority,
            client,
            dashboard,
        } => {
            let mut alerts = manager.repository().list_alerts_where(&|a| {
                status.map_or(true, |s| a.status == s)
                    && priority.map_or(true, |p| a.priority == p)
                    && client.as_deref().map_or(true, |c| a.client_id == c)
            })?;
            if dashboard {
                sort_for_dashboard(&mut alerts);
            }
            print_json(&alerts)?;
        }
        AlertsAction::Due { days } => {
            let days = days.unwrap_or_else(|| i64::from(config.alerts.due_window_days));
            let mut alerts = manager.get_alerts_due_within_days(days)?;
            sort_for_dashboard(&mut alerts);
            print_json(&alerts)?;
        }
        AlertsAction::Show { id } => {
            print_json(&manager.get_alert(&id)?)?;
        }
        AlertsAction::Edit {
            id,
            title,
            description,
            alert_type,
            priority,
            due,
        } => {
            let patch = AlertPatch {
                alert_type,
                priority,
                title,
                description,
                due_date: due,
                ..Default::default()
            };
            if patch.is_empty() {
                return Err("nothing to edit: pass at least one field".into());
            }
            print_json(&manager.update_alert(&id, patch)?)?;
        }
        AlertsAction::Resolve { id, by } => {
            print_json(&manager.resolve_alert(&id, &by)?)?;
        }
        AlertsAction::Snooze { id, until, days } => {
            let alert = match until {
                Some(until) => manager.snooze_alert(&id, until)?,
                None => manager
                    .snooze_alert_for_days(&id, days.unwrap_or(config.alerts.default_snooze_days))?,
            };
            print_json(&alert)?;
        }
        AlertsAction::Reactivate { id } => {
            print_json(&manager.reactivate_alert(&id)?)?;
        }
        AlertsAction::Delete { id } => {
            manager.delete_alert(&id)?;
            println!("Alert deleted: {id}");
        }
        AlertsAction::Sweep => {
            let woken = manager.check_for_snooze_expiration()?;
            print_json(&woken)?;
        }
        AlertsAction::Watch { interval } => {
            let sweeper =
                SnoozeSweeper::from_secs(interval.unwrap_or(config.alerts.sweep_interval_secs));
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            eprintln!(
                "Sweeping every {}s, Ctrl-C to stop",
                sweeper.interval().as_secs()
            );
            let total = runtime.block_on(sweeper.run(
                &mut manager,
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "failed to listen for Ctrl-C");
                    }
                },
                |_, events| print_events(&events),
            ))?;
            eprintln!("Reactivated {total} alert(s)");
        }
        AlertsAction::EvaluateRules { dry_run } => {
            let rules = ReminderRules::from_config(&config.rules);
            let clients = manager.repository().list_clients()?;
            if dry_run {
                let planned: Vec<NewAlert> = manager
                    .plan_rules(&rules, &clients, Utc::now())?
                    .into_iter()
                    .map(|c| c.alert)
                    .collect();
                print_json(&planned)?;
            } else {
                let created = manager.apply_rules(&rules, &clients, Utc::now())?;
                print_json(&created)?;
            }
        }
    }

    print_events(&manager.drain_events());
    Ok(())
}
