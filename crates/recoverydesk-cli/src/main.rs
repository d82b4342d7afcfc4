use clap::{Parser, Subcommand};
use recoverydesk_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "recoverydesk", version, about = "RecoveryDesk CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alert lifecycle: create, snooze, resolve, sweep
    Alerts {
        #[command(subcommand)]
        action: commands::alerts::AlertsAction,
    },
    /// Client records and the dated facts reminder rules watch
    Clients {
        #[command(subcommand)]
        action: commands::clients::ClientsAction,
    },
    /// Sobriety check-ins, streaks and milestones
    Sobriety {
        #[command(subcommand)]
        action: commands::sobriety::SobrietyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so JSON on stdout stays parseable. `RUST_LOG` wins over
/// the configured filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = Config::load_or_default().logging.filter;
        EnvFilter::try_new(&configured).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Alerts { action } => commands::alerts::run(action),
        Commands::Clients { action } => commands::clients::run(action),
        Commands::Sobriety { action } => commands::sobriety::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
