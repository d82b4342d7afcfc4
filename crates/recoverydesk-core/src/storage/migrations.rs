//! Database schema migrations for recoverydesk.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version, assuming 0");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: clients, alerts, check-in log and milestones.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS clients (
            id                       TEXT PRIMARY KEY,
            first_name               TEXT NOT NULL,
            last_name                TEXT NOT NULL,
            program_entry_date       TEXT,
            current_streak           INTEGER NOT NULL DEFAULT 0,
            longest_streak           INTEGER NOT NULL DEFAULT 0,
            last_relapse_date        TEXT,
            relapse_count            INTEGER NOT NULL DEFAULT 0,
            next_appointment_at      TEXT,
            insurance_expires_at     TEXT,
            next_court_date          TEXT,
            last_progress_note_at    TEXT,
            medication_refill_due_at TEXT,
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            seq          INTEGER PRIMARY KEY AUTOINCREMENT,
            id           TEXT NOT NULL UNIQUE,
            alert_type   TEXT NOT NULL,
            priority     TEXT NOT NULL,
            client_id    TEXT NOT NULL,
            client_name  TEXT NOT NULL DEFAULT '',
            title        TEXT NOT NULL,
            description  TEXT,
            created_at   TEXT NOT NULL,
            due_date     TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'active',
            snooze_until TEXT,
            resolved_at  TEXT,
            resolved_by  TEXT,
            related_id   TEXT,
            related_type TEXT,
            related_url  TEXT
        );

        CREATE TABLE IF NOT EXISTS sobriety_logs (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            client_id     TEXT NOT NULL REFERENCES clients(id),
            status        TEXT NOT NULL,
            check_in_date TEXT NOT NULL,
            notes         TEXT
        );

        CREATE TABLE IF NOT EXISTS sobriety_milestones (
            id            TEXT PRIMARY KEY,
            client_id     TEXT NOT NULL REFERENCES clients(id),
            days          INTEGER NOT NULL,
            achieved_date TEXT NOT NULL,
            notes         TEXT
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: query indexes and one milestone per (client, days).
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_alerts_status_due ON alerts(status, due_date);
         CREATE INDEX IF NOT EXISTS idx_alerts_client ON alerts(client_id);
         CREATE INDEX IF NOT EXISTS idx_sobriety_logs_client ON sobriety_logs(client_id, check_in_date);
         CREATE UNIQUE INDEX IF NOT EXISTS idx_milestones_client_days
             ON sobriety_milestones(client_id, days);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: per-alert write version for conditional updates.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch("ALTER TABLE alerts ADD COLUMN version INTEGER NOT NULL DEFAULT 0;")?;

    set_schema_version(&tx, 3)?;
    tx.commit()
}
