//! Repository traits the lifecycle and streak logic are written against.
//!
//! Implemented by [`InMemoryStore`](super::InMemoryStore) and the SQLite
//! [`Database`](super::Database).

use crate::alerts::{Alert, AlertStatus};
use crate::clients::Client;
use crate::error::Result;
use crate::sobriety::{SobrietyCheckIn, SobrietyMilestone};

/// Alert persistence.
pub trait AlertRepository {
    fn get_alert(&self, id: &str) -> Result<Option<Alert>>;

    /// All alerts in collection (creation) order.
    fn list_alerts(&self) -> Result<Vec<Alert>>;

    fn list_alerts_where(&self, predicate: &dyn Fn(&Alert) -> bool) -> Result<Vec<Alert>> {
        Ok(self
            .list_alerts()?
            .into_iter()
            .filter(|a| predicate(a))
            .collect())
    }

    fn insert_alert(&mut self, alert: &Alert) -> Result<()>;

    /// Overwrite the stored alert only if its stored status is still
    /// `expected` and its stored version equals `alert.version`. A successful
    /// write stores `alert.version + 1`. Returns false when no row matched.
    fn update_alert(&mut self, alert: &Alert, expected: AlertStatus) -> Result<bool>;

    /// Returns false when no row matched.
    fn delete_alert(&mut self, id: &str) -> Result<bool>;
}

/// Client persistence.
pub trait ClientRepository {
    fn get_client(&self, id: &str) -> Result<Option<Client>>;

    fn list_clients(&self) -> Result<Vec<Client>>;

    fn insert_client(&mut self, client: &Client) -> Result<()>;

    /// Returns false when no row matched.
    fn update_client(&mut self, client: &Client) -> Result<bool>;
}

/// Check-in log and milestone persistence.
pub trait SobrietyRepository: ClientRepository {
    fn get_check_in(&self, id: &str) -> Result<Option<SobrietyCheckIn>>;

    /// A client's log, oldest check-in first.
    fn list_check_ins(&self, client_id: &str) -> Result<Vec<SobrietyCheckIn>>;

    /// Returns false when no row matched.
    fn update_check_in_notes(&mut self, id: &str, notes: Option<&str>) -> Result<bool>;

    fn list_milestones(&self, client_id: &str) -> Result<Vec<SobrietyMilestone>>;

    /// Append `entry`, record `milestone` and write the client's streak state
    /// as one unit. On error nothing is persisted.
    fn commit_check_in(
        &mut self,
        client: &Client,
        entry: &SobrietyCheckIn,
        milestone: Option<&SobrietyMilestone>,
    ) -> Result<()>;
}
