//! In-memory repositories, for tests and dry runs.

use crate::alerts::{Alert, AlertStatus};
use crate::clients::Client;
use crate::error::{CoreError, DatabaseError, Result};
use crate::sobriety::{SobrietyCheckIn, SobrietyMilestone};

use super::repository::{AlertRepository, ClientRepository, SobrietyRepository};

/// Vec-backed store implementing every repository trait.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    alerts: Vec<Alert>,
    clients: Vec<Client>,
    check_ins: Vec<SobrietyCheckIn>,
    milestones: Vec<SobrietyMilestone>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertRepository for InMemoryStore {
    fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        Ok(self.alerts.iter().find(|a| a.id == id).cloned())
    }

    fn list_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.clone())
    }

    fn insert_alert(&mut self, alert: &Alert) -> Result<()> {
        if self.alerts.iter().any(|a| a.id == alert.id) {
            return Err(DatabaseError::QueryFailed(format!("duplicate alert id {}", alert.id)).into());
        }
        self.alerts.push(alert.clone());
        Ok(())
    }

    fn update_alert(&mut self, alert: &Alert, expected: AlertStatus) -> Result<bool> {
        match self
            .alerts
            .iter_mut()
            .find(|a| a.id == alert.id && a.status == expected && a.version == alert.version)
        {
            Some(stored) => {
                *stored = Alert {
                    version: alert.version.wrapping_add(1),
                    ..alert.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_alert(&mut self, id: &str) -> Result<bool> {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        Ok(self.alerts.len() != before)
    }
}

impl ClientRepository for InMemoryStore {
    fn get_client(&self, id: &str) -> Result<Option<Client>> {
        Ok(self.clients.iter().find(|c| c.id == id).cloned())
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.clients.clone())
    }

    fn insert_client(&mut self, client: &Client) -> Result<()> {
        if self.clients.iter().any(|c| c.id == client.id) {
            return Err(
                DatabaseError::QueryFailed(format!("duplicate client id {}", client.id)).into(),
            );
        }
        self.clients.push(client.clone());
        Ok(())
    }

    fn update_client(&mut self, client: &Client) -> Result<bool> {
        match self.clients.iter_mut().find(|c| c.id == client.id) {
            Some(stored) => {
                *stored = client.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl SobrietyRepository for InMemoryStore {
    fn get_check_in(&self, id: &str) -> Result<Option<SobrietyCheckIn>> {
        Ok(self.check_ins.iter().find(|c| c.id == id).cloned())
    }

    fn list_check_ins(&self, client_id: &str) -> Result<Vec<SobrietyCheckIn>> {
        let mut log: Vec<_> = self
            .check_ins
            .iter()
            .filter(|c| c.client_id == client_id)
            .cloned()
            .collect();
        log.sort_by_key(|c| c.check_in_date);
        Ok(log)
    }

    fn update_check_in_notes(&mut self, id: &str, notes: Option<&str>) -> Result<bool> {
        match self.check_ins.iter_mut().find(|c| c.id == id) {
            Some(entry) => {
                entry.notes = notes.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_milestones(&self, client_id: &str) -> Result<Vec<SobrietyMilestone>> {
        let mut found: Vec<_> = self
            .milestones
            .iter()
            .filter(|m| m.client_id == client_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.days);
        Ok(found)
    }

    fn commit_check_in(
        &mut self,
        client: &Client,
        entry: &SobrietyCheckIn,
        milestone: Option<&SobrietyMilestone>,
    ) -> Result<()> {
        // Validate everything up front so a failure leaves the store untouched.
        let index = self
            .clients
            .iter()
            .position(|c| c.id == client.id)
            .ok_or_else(|| CoreError::client_not_found(&client.id))?;
        if let Some(m) = milestone {
            if self
                .milestones
                .iter()
                .any(|existing| existing.client_id == m.client_id && existing.days == m.days)
            {
                return Err(DatabaseError::QueryFailed(format!(
                    "milestone {} already recorded for client {}",
                    m.days, m.client_id
                ))
                .into());
            }
        }

        self.check_ins.push(entry.clone());
        if let Some(m) = milestone {
            self.milestones.push(m.clone());
        }
        self.clients[index] = client.clone();
        Ok(())
    }
}
