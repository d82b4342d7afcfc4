//! # RecoveryDesk Core Library
//!
//! Core business logic for RecoveryDesk, a case-management helper for
//! recovery programs. Every operation is available through the standalone
//! `recoverydesk` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Alerts**: action items tied to a client, with a strict
//!   active / snoozed / resolved lifecycle and a periodic snooze sweep
//! - **Reminder rules**: dated client facts (court dates, insurance expiry,
//!   refills) turned into alerts ahead of time
//! - **Sobriety**: check-in log, streak calculator and milestones
//! - **Storage**: repository traits with SQLite and in-memory backends, plus
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`AlertManager`]: Alert lifecycle over an [`AlertRepository`]
//! - [`SobrietyService`]: Check-ins and streaks over a [`SobrietyRepository`]
//! - [`Database`]: SQLite persistence
//! - [`Config`]: Application configuration management

pub mod alerts;
pub mod clients;
pub mod error;
pub mod events;
pub mod sobriety;
pub mod storage;

pub use alerts::{
    sort_for_dashboard, Alert, AlertManager, AlertPatch, AlertPriority, AlertStatus,
    AlertTransitionError, AlertType, NewAlert, ReminderRules, RuleCandidate, SnoozeSweeper,
};
pub use clients::{Client, ClientFact};
pub use error::{ConfigError, CoreError, DatabaseError, RecordKind, Result, ValidationError};
pub use events::{Event, Notification, Severity};
pub use sobriety::{
    next_milestone, CheckInStatus, NewCheckIn, SobrietyCheckIn, SobrietyMilestone,
    SobrietyService, StreakState, StreakSummary, MILESTONE_DAYS,
};
pub use storage::{
    data_dir, AlertRepository, ClientRepository, Config, Database, InMemoryStore,
    SobrietyRepository,
};
