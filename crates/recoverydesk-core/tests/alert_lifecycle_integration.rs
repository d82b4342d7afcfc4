//! Integration tests for the alert lifecycle against the SQLite backend.

use chrono::{DateTime, Duration, TimeZone, Utc};
use recoverydesk_core::{
    sort_for_dashboard, AlertManager, AlertPatch, AlertPriority, AlertStatus, AlertType, Client,
    CoreError, Database, Event, NewAlert, ReminderRules,
};
use recoverydesk_core::storage::AlertRepository;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap()
}

fn alert_for(client_id: &str, priority: AlertPriority, due: DateTime<Utc>) -> NewAlert {
    NewAlert {
        alert_type: AlertType::Appointment,
        priority,
        client_id: client_id.to_string(),
        client_name: "Casey Morgan".to_string(),
        title: "Intake follow-up".to_string(),
        description: Some("Confirm transport".to_string()),
        due_date: due,
        related_id: None,
        related_type: None,
        related_url: None,
    }
}

fn manager() -> AlertManager<Database> {
    AlertManager::new(Database::open_memory().unwrap())
}

#[test]
fn test_full_lifecycle_persists() {
    let mut m = manager();
    let alert = m
        .create_alert_at(alert_for("c-1", AlertPriority::High, now()), now())
        .unwrap();

    m.snooze_alert_for_days_at(&alert.id, 1, now()).unwrap();
    let stored = m.get_alert(&alert.id).unwrap();
    assert_eq!(stored.status, AlertStatus::Snoozed);
    assert_eq!(stored.snooze_until, Some(now() + Duration::days(1)));

    m.reactivate_alert(&alert.id).unwrap();
    m.resolve_alert_at(&alert.id, "case manager", now()).unwrap();

    let stored = m.get_alert(&alert.id).unwrap();
    assert_eq!(stored.status, AlertStatus::Resolved);
    assert_eq!(stored.resolved_by.as_deref(), Some("case manager"));
    assert_eq!(stored.resolved_at, Some(now()));
    assert!(stored.snooze_until.is_none());

    let kinds: Vec<&str> = m
        .drain_events()
        .iter()
        .map(|e| match e {
            Event::AlertCreated { .. } => "created",
            Event::AlertSnoozed { .. } => "snoozed",
            Event::AlertReactivated { .. } => "reactivated",
            Event::AlertResolved { .. } => "resolved",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "snoozed", "reactivated", "resolved"]);
}

#[test]
fn test_resolved_alert_cannot_be_reactivated() {
    let mut m = manager();
    let alert = m
        .create_alert_at(alert_for("c-1", AlertPriority::Low, now()), now())
        .unwrap();
    m.resolve_alert_at(&alert.id, "staff", now()).unwrap();

    assert!(matches!(
        m.reactivate_alert(&alert.id),
        Err(CoreError::InvalidTransition(_))
    ));
    assert!(matches!(
        m.resolve_alert_at(&alert.id, "someone else", now()),
        Err(CoreError::InvalidTransition(_))
    ));
    assert_eq!(
        m.get_alert(&alert.id).unwrap().resolved_by.as_deref(),
        Some("staff")
    );
}

#[test]
fn test_sweep_is_idempotent_on_sqlite() {
    let mut m = manager();
    for hours in [1, 2, 48] {
        let a = m
            .create_alert_at(alert_for("c-1", AlertPriority::Medium, now()), now())
            .unwrap();
        m.snooze_alert_at(&a.id, now() + Duration::hours(hours), now())
            .unwrap();
    }

    let later = now() + Duration::hours(3);
    assert_eq!(m.check_for_snooze_expiration_at(later).unwrap().len(), 2);
    let snapshot = m.list_alerts().unwrap();
    assert!(m.check_for_snooze_expiration_at(later).unwrap().is_empty());
    assert_eq!(m.list_alerts().unwrap(), snapshot);
}

#[test]
fn test_due_within_one_day() {
    let mut m = manager();
    let due_now = m
        .create_alert_at(alert_for("c-1", AlertPriority::Low, now()), now())
        .unwrap();
    m.create_alert_at(
        alert_for("c-1", AlertPriority::Low, now() + Duration::days(2)),
        now(),
    )
    .unwrap();

    let due = m.get_alerts_due_within_days_at(1, now()).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, due_now.id);
}

#[test]
fn test_dashboard_order_from_storage() {
    let mut m = manager();
    m.create_alert_at(alert_for("c-1", AlertPriority::Low, now()), now())
        .unwrap();
    m.create_alert_at(
        alert_for("c-2", AlertPriority::Urgent, now() + Duration::days(3)),
        now(),
    )
    .unwrap();
    m.create_alert_at(
        alert_for("c-3", AlertPriority::Urgent, now() + Duration::days(1)),
        now(),
    )
    .unwrap();

    let mut active = m.get_active_alerts().unwrap();
    sort_for_dashboard(&mut active);
    let clients: Vec<&str> = active.iter().map(|a| a.client_id.as_str()).collect();
    assert_eq!(clients, vec!["c-3", "c-2", "c-1"]);
}

#[test]
fn test_edit_and_delete() {
    let mut m = manager();
    let alert = m
        .create_alert_at(alert_for("c-1", AlertPriority::Low, now()), now())
        .unwrap();

    let edited = m
        .update_alert(
            &alert.id,
            AlertPatch {
                priority: Some(AlertPriority::Urgent),
                description: Some("Bring ID".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(edited.status, AlertStatus::Active);
    assert_eq!(m.get_alert(&alert.id).unwrap().priority, AlertPriority::Urgent);
    assert_eq!(m.get_alerts_by_priority(AlertPriority::Urgent).unwrap().len(), 1);

    m.delete_alert(&alert.id).unwrap();
    assert!(m.get_alert(&alert.id).unwrap_err().is_not_found());
    assert!(m.delete_alert(&alert.id).unwrap_err().is_not_found());
}

#[test]
fn test_rule_sweep_on_sqlite() {
    let mut m = manager();
    let mut client = Client::new("Casey", "Morgan");
    client.insurance_expires_at = Some(now() + Duration::days(20));
    client.medication_refill_due_at = Some(now() + Duration::days(2));

    let created = m
        .apply_rules(&ReminderRules::default(), &[client.clone()], now())
        .unwrap();
    let types: Vec<AlertType> = created.iter().map(|a| a.alert_type).collect();
    assert_eq!(types, vec![AlertType::Insurance, AlertType::Medication]);

    assert!(m
        .apply_rules(&ReminderRules::default(), &[client], now())
        .unwrap()
        .is_empty());
    assert_eq!(m.list_alerts().unwrap().len(), 2);
}

#[test]
fn test_stale_reader_loses_to_resnooze_on_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recoverydesk.db");
    let mut sweeper = Database::open_at(&path).unwrap();
    let mut desk = AlertManager::new(Database::open_at(&path).unwrap());

    let alert = desk
        .create_alert_at(alert_for("c-1", AlertPriority::Medium, now()), now())
        .unwrap();
    desk.snooze_alert_at(&alert.id, now() + Duration::hours(1), now())
        .unwrap();

    // The sweeper reads the expired snooze before the desk extends it.
    let later = now() + Duration::hours(2);
    let mut stale = sweeper
        .list_alerts_where(&|a| a.snooze_expired(later))
        .unwrap()
        .pop()
        .unwrap();
    let extended = desk.snooze_alert_for_days_at(&alert.id, 7, later).unwrap();

    stale.reactivate().unwrap();
    assert!(!sweeper.update_alert(&stale, AlertStatus::Snoozed).unwrap());

    let stored = desk.get_alert(&alert.id).unwrap();
    assert_eq!(stored.status, AlertStatus::Snoozed);
    assert_eq!(stored.snooze_until, Some(later + Duration::days(7)));
    assert_eq!(stored.version, extended.version);
}

#[test]
fn test_concurrent_edits_on_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recoverydesk.db");
    let mut first = AlertManager::new(Database::open_at(&path).unwrap());
    let mut second = Database::open_at(&path).unwrap();

    let alert = first
        .create_alert_at(alert_for("c-1", AlertPriority::Low, now()), now())
        .unwrap();
    let mut stale = second.get_alert(&alert.id).unwrap().unwrap();

    first
        .update_alert(
            &alert.id,
            AlertPatch {
                title: Some("Call probation officer".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    stale.title = "Overwrite".to_string();
    assert!(!second.update_alert(&stale, AlertStatus::Active).unwrap());
    assert_eq!(
        first.get_alert(&alert.id).unwrap().title,
        "Call probation officer"
    );

    // A fresh read carries the new version and goes through.
    let mut fresh = second.get_alert(&alert.id).unwrap().unwrap();
    fresh.title = "Call case worker".to_string();
    assert!(second.update_alert(&fresh, AlertStatus::Active).unwrap());
    assert_eq!(first.get_alert(&alert.id).unwrap().title, "Call case worker");
}
