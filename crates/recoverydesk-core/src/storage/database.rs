//! SQLite-backed repositories.
//!
//! Provides persistent storage for:
//! - Clients and their cached streak state
//! - Alerts
//! - The sobriety check-in log and milestones
//!
//! Timestamps are stored as RFC 3339 text.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::alerts::{Alert, AlertPriority, AlertStatus, AlertType};
use crate::clients::Client;
use crate::error::{CoreError, DatabaseError, Result};
use crate::sobriety::{CheckInStatus, SobrietyCheckIn, SobrietyMilestone, StreakState};

use super::data_dir;
use super::migrations;
use super::repository::{AlertRepository, ClientRepository, SobrietyRepository};

// === Helper Functions ===

fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn format_opt_ts(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(format_ts)
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(column, value))
}

fn parse_opt_ts(column: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    value.map(|v| parse_ts(column, &v)).transpose()
}

fn corrupt(column: &str, value: &str) -> DatabaseError {
    DatabaseError::CorruptValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

const ALERT_COLUMNS: &str = "id, alert_type, priority, client_id, client_name, title, description,
     created_at, due_date, status, snooze_until, resolved_at, resolved_by,
     related_id, related_type, related_url, version";

/// Raw alert row; decoded outside the rusqlite closure so decode failures
/// surface as [`DatabaseError::CorruptValue`].
struct AlertRow {
    id: String,
    alert_type: String,
    priority: String,
    client_id: String,
    client_name: String,
    title: String,
    description: Option<String>,
    created_at: String,
    due_date: String,
    status: String,
    snooze_until: Option<String>,
    resolved_at: Option<String>,
    resolved_by: Option<String>,
    related_id: Option<String>,
    related_type: Option<String>,
    related_url: Option<String>,
    version: u32,
}

fn read_alert_row(row: &rusqlite::Row) -> rusqlite::Result<AlertRow> {
    Ok(AlertRow {
        id: row.get(0)?,
        alert_type: row.get(1)?,
        priority: row.get(2)?,
        client_id: row.get(3)?,
        client_name: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        due_date: row.get(8)?,
        status: row.get(9)?,
        snooze_until: row.get(10)?,
        resolved_at: row.get(11)?,
        resolved_by: row.get(12)?,
        related_id: row.get(13)?,
        related_type: row.get(14)?,
        related_url: row.get(15)?,
        version: row.get(16)?,
    })
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, DatabaseError> {
        Ok(Alert {
            alert_type: AlertType::parse(&self.alert_type)
                .ok_or_else(|| corrupt("alert_type", &self.alert_type))?,
            priority: AlertPriority::parse(&self.priority)
                .ok_or_else(|| corrupt("priority", &self.priority))?,
            status: AlertStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?,
            created_at: parse_ts("created_at", &self.created_at)?,
            due_date: parse_ts("due_date", &self.due_date)?,
            snooze_until: parse_opt_ts("snooze_until", self.snooze_until)?,
            resolved_at: parse_opt_ts("resolved_at", self.resolved_at)?,
            id: self.id,
            client_id: self.client_id,
            client_name: self.client_name,
            title: self.title,
            description: self.description,
            resolved_by: self.resolved_by,
            related_id: self.related_id,
            related_type: self.related_type,
            related_url: self.related_url,
            version: self.version,
        })
    }
}

const CLIENT_COLUMNS: &str = "id, first_name, last_name, program_entry_date,
     current_streak, longest_streak, last_relapse_date, relapse_count,
     next_appointment_at, insurance_expires_at, next_court_date,
     last_progress_note_at, medication_refill_due_at, created_at, updated_at";

struct ClientRow {
    id: String,
    first_name: String,
    last_name: String,
    program_entry_date: Option<String>,
    current_streak: u32,
    longest_streak: u32,
    last_relapse_date: Option<String>,
    relapse_count: u32,
    next_appointment_at: Option<String>,
    insurance_expires_at: Option<String>,
    next_court_date: Option<String>,
    last_progress_note_at: Option<String>,
    medication_refill_due_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_client_row(row: &rusqlite::Row) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        program_entry_date: row.get(3)?,
        current_streak: row.get(4)?,
        longest_streak: row.get(5)?,
        last_relapse_date: row.get(6)?,
        relapse_count: row.get(7)?,
        next_appointment_at: row.get(8)?,
        insurance_expires_at: row.get(9)?,
        next_court_date: row.get(10)?,
        last_progress_note_at: row.get(11)?,
        medication_refill_due_at: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl ClientRow {
    fn into_client(self) -> Result<Client, DatabaseError> {
        Ok(Client {
            program_entry_date: parse_opt_ts("program_entry_date", self.program_entry_date)?,
            streak: StreakState {
                current_streak: self.current_streak,
                longest_streak: self.longest_streak,
                last_relapse_date: parse_opt_ts("last_relapse_date", self.last_relapse_date)?,
                relapse_count: self.relapse_count,
            },
            next_appointment_at: parse_opt_ts("next_appointment_at", self.next_appointment_at)?,
            insurance_expires_at: parse_opt_ts("insurance_expires_at", self.insurance_expires_at)?,
            next_court_date: parse_opt_ts("next_court_date", self.next_court_date)?,
            last_progress_note_at: parse_opt_ts("last_progress_note_at", self.last_progress_note_at)?,
            medication_refill_due_at: parse_opt_ts(
                "medication_refill_due_at",
                self.medication_refill_due_at,
            )?,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

fn read_check_in(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String, String, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_check_in(
    (id, client_id, status, check_in_date, notes): (String, String, String, String, Option<String>),
) -> Result<SobrietyCheckIn, DatabaseError> {
    Ok(SobrietyCheckIn {
        status: CheckInStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        check_in_date: parse_ts("check_in_date", &check_in_date)?,
        id,
        client_id,
        notes,
    })
}

/// SQLite database for case records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/recoverydesk.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("recoverydesk.db");
        Self::open_at(path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        tracing::debug!(
            version = migrations::get_schema_version(&conn),
            "database ready"
        );
        Ok(Self { conn })
    }
}

impl AlertRepository for Database {
    fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"))?;
        let row = stmt.query_row(params![id], read_alert_row).optional()?;
        Ok(row.map(AlertRow::into_alert).transpose()?)
    }

    fn list_alerts(&self) -> Result<Vec<Alert>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY seq"))?;
        let rows = stmt.query_map([], read_alert_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?.into_alert()?);
        }
        Ok(alerts)
    }

    fn insert_alert(&mut self, alert: &Alert) -> Result<()> {
        self.conn.execute(
            "INSERT INTO alerts (
                id, alert_type, priority, client_id, client_name, title, description,
                created_at, due_date, status, snooze_until, resolved_at, resolved_by,
                related_id, related_type, related_url, version
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                alert.id,
                alert.alert_type.as_str(),
                alert.priority.as_str(),
                alert.client_id,
                alert.client_name,
                alert.title,
                alert.description,
                format_ts(alert.created_at),
                format_ts(alert.due_date),
                alert.status.as_str(),
                format_opt_ts(alert.snooze_until),
                format_opt_ts(alert.resolved_at),
                alert.resolved_by,
                alert.related_id,
                alert.related_type,
                alert.related_url,
                alert.version,
            ],
        )?;
        Ok(())
    }

    fn update_alert(&mut self, alert: &Alert, expected: AlertStatus) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE alerts SET
                alert_type = ?2, priority = ?3, client_name = ?4, title = ?5,
                description = ?6, due_date = ?7, status = ?8, snooze_until = ?9,
                resolved_at = ?10, resolved_by = ?11, related_id = ?12,
                related_type = ?13, related_url = ?14, version = version + 1
             WHERE id = ?1 AND status = ?15 AND version = ?16",
            params![
                alert.id,
                alert.alert_type.as_str(),
                alert.priority.as_str(),
                alert.client_name,
                alert.title,
                alert.description,
                format_ts(alert.due_date),
                alert.status.as_str(),
                format_opt_ts(alert.snooze_until),
                format_opt_ts(alert.resolved_at),
                alert.resolved_by,
                alert.related_id,
                alert.related_type,
                alert.related_url,
                expected.as_str(),
                alert.version,
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_alert(&mut self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM alerts WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    }
}

impl ClientRepository for Database {
    fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"))?;
        let row = stmt.query_row(params![id], read_client_row).optional()?;
        Ok(row.map(ClientRow::into_client).transpose()?)
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY last_name, first_name"
        ))?;
        let rows = stmt.query_map([], read_client_row)?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?.into_client()?);
        }
        Ok(clients)
    }

    fn insert_client(&mut self, client: &Client) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO clients ({CLIENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                client.id,
                client.first_name,
                client.last_name,
                format_opt_ts(client.program_entry_date),
                client.streak.current_streak,
                client.streak.longest_streak,
                format_opt_ts(client.streak.last_relapse_date),
                client.streak.relapse_count,
                format_opt_ts(client.next_appointment_at),
                format_opt_ts(client.insurance_expires_at),
                format_opt_ts(client.next_court_date),
                format_opt_ts(client.last_progress_note_at),
                format_opt_ts(client.medication_refill_due_at),
                format_ts(client.created_at),
                format_ts(client.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_client(&mut self, client: &Client) -> Result<bool> {
        Ok(write_client(&self.conn, client)? == 1)
    }
}

fn write_client(conn: &Connection, client: &Client) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE clients SET
            first_name = ?2, last_name = ?3, program_entry_date = ?4,
            current_streak = ?5, longest_streak = ?6, last_relapse_date = ?7,
            relapse_count = ?8, next_appointment_at = ?9, insurance_expires_at = ?10,
            next_court_date = ?11, last_progress_note_at = ?12,
            medication_refill_due_at = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            client.id,
            client.first_name,
            client.last_name,
            format_opt_ts(client.program_entry_date),
            client.streak.current_streak,
            client.streak.longest_streak,
            format_opt_ts(client.streak.last_relapse_date),
            client.streak.relapse_count,
            format_opt_ts(client.next_appointment_at),
            format_opt_ts(client.insurance_expires_at),
            format_opt_ts(client.next_court_date),
            format_opt_ts(client.last_progress_note_at),
            format_opt_ts(client.medication_refill_due_at),
            format_ts(client.updated_at),
        ],
    )
}

impl SobrietyRepository for Database {
    fn get_check_in(&self, id: &str) -> Result<Option<SobrietyCheckIn>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, status, check_in_date, notes
             FROM sobriety_logs WHERE id = ?1",
        )?;
        let row = stmt.query_row(params![id], read_check_in).optional()?;
        Ok(row.map(into_check_in).transpose()?)
    }

    fn list_check_ins(&self, client_id: &str) -> Result<Vec<SobrietyCheckIn>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, status, check_in_date, notes
             FROM sobriety_logs WHERE client_id = ?1
             ORDER BY check_in_date, seq",
        )?;
        let rows = stmt.query_map(params![client_id], read_check_in)?;

        let mut log = Vec::new();
        for row in rows {
            log.push(into_check_in(row?)?);
        }
        Ok(log)
    }

    fn update_check_in_notes(&mut self, id: &str, notes: Option<&str>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sobriety_logs SET notes = ?2 WHERE id = ?1",
            params![id, notes],
        )?;
        Ok(changed == 1)
    }

    fn list_milestones(&self, client_id: &str) -> Result<Vec<SobrietyMilestone>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, days, achieved_date, notes
             FROM sobriety_milestones WHERE client_id = ?1
             ORDER BY days",
        )?;
        let rows = stmt.query_map(params![client_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut milestones = Vec::new();
        for row in rows {
            let (id, client_id, days, achieved_date, notes) = row?;
            milestones.push(SobrietyMilestone {
                achieved_date: parse_ts("achieved_date", &achieved_date)?,
                id,
                client_id,
                days,
                notes,
            });
        }
        Ok(milestones)
    }

    fn commit_check_in(
        &mut self,
        client: &Client,
        entry: &SobrietyCheckIn,
        milestone: Option<&SobrietyMilestone>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        if write_client(&tx, client)? == 0 {
            return Err(CoreError::client_not_found(&client.id));
        }

        tx.execute(
            "INSERT INTO sobriety_logs (id, client_id, status, check_in_date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.client_id,
                entry.status.as_str(),
                format_ts(entry.check_in_date),
                entry.notes,
            ],
        )?;

        if let Some(m) = milestone {
            tx.execute(
                "INSERT INTO sobriety_milestones (id, client_id, days, achieved_date, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![m.id, m.client_id, m.days, format_ts(m.achieved_date), m.notes],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::NewAlert;
    use chrono::Duration;

    fn sample_alert(client: &Client) -> Alert {
        Alert::from_new(
            NewAlert {
                alert_type: AlertType::Insurance,
                priority: AlertPriority::High,
                client_id: client.id.clone(),
                client_name: client.display_name(),
                title: "Renew Medicaid".to_string(),
                description: Some("Coverage lapses end of month".to_string()),
                due_date: Utc::now() + Duration::days(10),
                related_id: Some("policy-7".to_string()),
                related_type: Some("insurance".to_string()),
                related_url: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn alert_crud() {
        let mut db = Database::open_memory().unwrap();
        let client = Client::new("Jordan", "Reyes");
        db.insert_client(&client).unwrap();

        let alert = sample_alert(&client);
        db.insert_alert(&alert).unwrap();

        let loaded = db.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Renew Medicaid");
        assert_eq!(loaded.priority, AlertPriority::High);
        assert_eq!(loaded.related_id.as_deref(), Some("policy-7"));

        assert!(db.delete_alert(&alert.id).unwrap());
        assert!(!db.delete_alert(&alert.id).unwrap());
        assert!(db.get_alert(&alert.id).unwrap().is_none());
    }

    #[test]
    fn update_alert_is_conditional_on_status() {
        let mut db = Database::open_memory().unwrap();
        let client = Client::new("Jordan", "Reyes");
        let mut alert = sample_alert(&client);
        db.insert_alert(&alert).unwrap();

        alert.resolve("staff", Utc::now()).unwrap();
        assert!(!db.update_alert(&alert, AlertStatus::Snoozed).unwrap());
        assert!(db.update_alert(&alert, AlertStatus::Active).unwrap());
        assert!(!db.update_alert(&alert, AlertStatus::Active).unwrap());

        let stored = db.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert_eq!(stored.resolved_by.as_deref(), Some("staff"));
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn update_alert_rejects_stale_version() {
        let mut db = Database::open_memory().unwrap();
        let client = Client::new("Jordan", "Reyes");
        let alert = sample_alert(&client);
        db.insert_alert(&alert).unwrap();

        let mut first = alert.clone();
        first.title = "Renew Medicaid today".to_string();
        assert!(db.update_alert(&first, AlertStatus::Active).unwrap());

        // Same status, older version: the edit above must survive.
        let mut second = alert.clone();
        second.priority = AlertPriority::Low;
        assert!(!db.update_alert(&second, AlertStatus::Active).unwrap());

        let stored = db.get_alert(&alert.id).unwrap().unwrap();
        assert_eq!(stored.title, "Renew Medicaid today");
        assert_eq!(stored.priority, AlertPriority::High);
    }

    #[test]
    fn list_alerts_keeps_insertion_order() {
        let mut db = Database::open_memory().unwrap();
        let client = Client::new("A", "B");
        let ids: Vec<String> = (0..3)
            .map(|_| {
                let alert = sample_alert(&client);
                db.insert_alert(&alert).unwrap();
                alert.id
            })
            .collect();
        let listed: Vec<String> = db.list_alerts().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn client_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let mut client = Client::new("Sam", "Lee");
        client.program_entry_date = Some(Utc::now() - Duration::days(40));
        client.next_court_date = Some(Utc::now() + Duration::days(3));
        db.insert_client(&client).unwrap();

        let loaded = db.get_client(&client.id).unwrap().unwrap();
        assert_eq!(loaded.display_name(), "Sam Lee");
        assert_eq!(loaded.streak, StreakState::default());
        assert!(loaded.next_court_date.is_some());

        client.streak.current_streak = 4;
        client.streak.longest_streak = 9;
        assert!(db.update_client(&client).unwrap());
        let loaded = db.get_client(&client.id).unwrap().unwrap();
        assert_eq!(loaded.streak.current_streak, 4);
        assert_eq!(loaded.streak.longest_streak, 9);
    }

    #[test]
    fn corrupt_status_is_reported() {
        let mut db = Database::open_memory().unwrap();
        let client = Client::new("A", "B");
        let alert = sample_alert(&client);
        db.insert_alert(&alert).unwrap();
        db.conn()
            .execute("UPDATE alerts SET status = 'archived'", [])
            .unwrap();

        let err = db.get_alert(&alert.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::CorruptValue { ref column, .. }) if column == "status"
        ));
    }
}
