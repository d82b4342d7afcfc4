mod config;
pub mod database;
mod memory;
pub mod migrations;
pub mod repository;

pub use config::{AlertsConfig, Config, LoggingConfig, RulesConfig};
pub use database::Database;
pub use memory::InMemoryStore;
pub use repository::{AlertRepository, ClientRepository, SobrietyRepository};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory.
///
/// `RECOVERYDESK_DATA_DIR` wins when set; otherwise `~/.config/recoverydesk[-dev]/`
/// based on `RECOVERYDESK_ENV` (set it to `dev` for a separate development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("RECOVERYDESK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("RECOVERYDESK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("recoverydesk-dev")
            } else {
                base_dir.join("recoverydesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
