//! Alert lifecycle manager.
//!
//! Wraps an [`AlertRepository`] and applies the alert state machine to it.
//! Every time-dependent operation has an `_at` variant taking the current
//! instant explicitly; the plain variant uses `Utc::now()`.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{
    days_after, Alert, AlertPatch, AlertPriority, AlertStatus, NewAlert, ReminderRules,
    RuleCandidate,
};
use crate::clients::Client;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::storage::AlertRepository;

pub struct AlertManager<R> {
    repo: R,
    events: Vec<Event>,
}

impl<R: AlertRepository> AlertManager<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            events: Vec::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_inner(self) -> R {
        self.repo
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // === Queries ===

    pub fn get_alert(&self, id: &str) -> Result<Alert> {
        self.repo
            .get_alert(id)?
            .ok_or_else(|| CoreError::alert_not_found(id))
    }

    pub fn list_alerts(&self) -> Result<Vec<Alert>> {
        self.repo.list_alerts()
    }

    /// Active alerts in collection order. Use
    /// [`sort_for_dashboard`](super::sort_for_dashboard) for display order.
    pub fn get_active_alerts(&self) -> Result<Vec<Alert>> {
        self.repo
            .list_alerts_where(&|a| a.status == AlertStatus::Active)
    }

    pub fn get_alerts_by_priority(&self, priority: AlertPriority) -> Result<Vec<Alert>> {
        self.repo.list_alerts_where(&|a| a.priority == priority)
    }

    pub fn get_alerts_due_within_days(&self, days: i64) -> Result<Vec<Alert>> {
        self.get_alerts_due_within_days_at(days, Utc::now())
    }

    /// Active alerts due at or before `now + days`. The boundary is inclusive.
    pub fn get_alerts_due_within_days_at(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        if days < 0 {
            return Err(ValidationError::invalid("days", "must not be negative").into());
        }
        let horizon = days_after(now, days)
            .ok_or_else(|| ValidationError::invalid("days", "out of range"))?;
        let due = self
            .repo
            .list_alerts_where(&|a| a.status == AlertStatus::Active && a.due_date <= horizon)?;
        debug!(days, count = due.len(), "due-within query");
        Ok(due)
    }

    // === Mutations ===

    pub fn create_alert(&mut self, data: NewAlert) -> Result<Alert> {
        self.create_alert_at(data, Utc::now())
    }

    pub fn create_alert_at(&mut self, data: NewAlert, now: DateTime<Utc>) -> Result<Alert> {
        if data.title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty").into());
        }
        if data.client_id.trim().is_empty() {
            return Err(ValidationError::invalid("client_id", "must not be empty").into());
        }

        let alert = Alert::from_new(data, now);
        self.repo.insert_alert(&alert)?;
        info!(
            alert_id = %alert.id,
            client_id = %alert.client_id,
            alert_type = alert.alert_type.as_str(),
            priority = alert.priority.as_str(),
            "alert created"
        );
        self.events.push(Event::AlertCreated {
            alert_id: alert.id.clone(),
            client_id: alert.client_id.clone(),
            alert_type: alert.alert_type,
            priority: alert.priority,
            due_date: alert.due_date,
            at: now,
        });
        Ok(alert)
    }

    /// Partial edit; the status never changes.
    pub fn update_alert(&mut self, id: &str, patch: AlertPatch) -> Result<Alert> {
        if matches!(patch.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ValidationError::invalid("title", "must not be empty").into());
        }
        let mut alert = self.get_alert(id)?;
        let expected = alert.status;
        alert.apply_patch(patch);
        self.write_back(&mut alert, expected)?;
        debug!(alert_id = %id, "alert updated");
        self.events.push(Event::AlertUpdated {
            alert_id: id.to_string(),
            at: Utc::now(),
        });
        Ok(alert)
    }

    pub fn resolve_alert(&mut self, id: &str, resolved_by: &str) -> Result<Alert> {
        self.resolve_alert_at(id, resolved_by, Utc::now())
    }

    pub fn resolve_alert_at(
        &mut self,
        id: &str,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        if resolved_by.trim().is_empty() {
            return Err(ValidationError::invalid("resolved_by", "must not be empty").into());
        }
        let mut alert = self.get_alert(id)?;
        let expected = alert.status;
        alert
            .resolve(resolved_by, now)
            .map_err(|e| rejected(e.into()))?;
        self.write_back(&mut alert, expected)?;
        info!(alert_id = %id, resolved_by, "alert resolved");
        self.events.push(Event::AlertResolved {
            alert_id: id.to_string(),
            resolved_by: resolved_by.to_string(),
            at: now,
        });
        Ok(alert)
    }

    pub fn snooze_alert(&mut self, id: &str, until: DateTime<Utc>) -> Result<Alert> {
        self.snooze_alert_at(id, until, Utc::now())
    }

    /// Snooze until `until`, which must be after `now`.
    pub fn snooze_alert_at(
        &mut self,
        id: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        if until <= now {
            return Err(ValidationError::SnoozeNotInFuture { until, now }.into());
        }
        let mut alert = self.get_alert(id)?;
        let expected = alert.status;
        alert.snooze(until).map_err(|e| rejected(e.into()))?;
        self.write_back(&mut alert, expected)?;
        info!(alert_id = %id, until = %until, "alert snoozed");
        self.events.push(Event::AlertSnoozed {
            alert_id: id.to_string(),
            until,
            at: now,
        });
        Ok(alert)
    }

    pub fn snooze_alert_for_days(&mut self, id: &str, days: u32) -> Result<Alert> {
        self.snooze_alert_for_days_at(id, days, Utc::now())
    }

    pub fn snooze_alert_for_days_at(
        &mut self,
        id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        if days == 0 {
            return Err(ValidationError::invalid("days", "must be at least 1").into());
        }
        let until = days_after(now, i64::from(days))
            .ok_or_else(|| ValidationError::invalid("days", "out of range"))?;
        self.snooze_alert_at(id, until, now)
    }

    pub fn reactivate_alert(&mut self, id: &str) -> Result<Alert> {
        let mut alert = self.get_alert(id)?;
        let expected = alert.status;
        alert.reactivate().map_err(|e| rejected(e.into()))?;
        self.write_back(&mut alert, expected)?;
        info!(alert_id = %id, "alert reactivated");
        self.events.push(Event::AlertReactivated {
            alert_id: id.to_string(),
            automatic: false,
            at: Utc::now(),
        });
        Ok(alert)
    }

    pub fn delete_alert(&mut self, id: &str) -> Result<()> {
        if !self.repo.delete_alert(id)? {
            return Err(CoreError::alert_not_found(id));
        }
        info!(alert_id = %id, "alert deleted");
        self.events.push(Event::AlertDeleted {
            alert_id: id.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }

    // === Sweeps ===

    pub fn check_for_snooze_expiration(&mut self) -> Result<Vec<Alert>> {
        self.check_for_snooze_expiration_at(Utc::now())
    }

    /// Reactivate every snoozed alert whose `snooze_until` is before `now`.
    ///
    /// Returns the alerts that were woken. Running it again at the same
    /// instant wakes nothing.
    pub fn check_for_snooze_expiration_at(&mut self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        let expired = self.repo.list_alerts_where(&|a| a.snooze_expired(now))?;
        let mut woken = Vec::with_capacity(expired.len());

        for mut alert in expired {
            alert.reactivate()?;
            match self.write_back(&mut alert, AlertStatus::Snoozed) {
                Ok(()) => {}
                // Someone else resolved, re-snoozed or deleted it first.
                Err(CoreError::Conflict { .. }) | Err(CoreError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
            info!(alert_id = %alert.id, "snooze expired, alert reactivated");
            self.events.push(Event::AlertReactivated {
                alert_id: alert.id.clone(),
                automatic: true,
                at: now,
            });
            woken.push(alert);
        }

        debug!(reactivated = woken.len(), "snooze sweep finished");
        Ok(woken)
    }

    /// Candidates `rules` would create right now, after dropping those that
    /// already have an alert. Nothing is written.
    pub fn plan_rules(
        &self,
        rules: &ReminderRules,
        clients: &[Client],
        now: DateTime<Utc>,
    ) -> Result<Vec<RuleCandidate>> {
        let candidates = clients
            .iter()
            .flat_map(|client| rules.evaluate(client, now))
            .collect();
        self.unraised(candidates)
    }

    /// Evaluate `rules` for every client and create the missing alerts.
    pub fn apply_rules(
        &mut self,
        rules: &ReminderRules,
        clients: &[Client],
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let planned = self.plan_rules(rules, clients, now)?;
        let created = self.create_candidates(planned, now)?;
        info!(
            clients = clients.len(),
            created = created.len(),
            "reminder rules applied"
        );
        Ok(created)
    }

    /// Create alerts for rule candidates that have no alert yet.
    pub fn apply_rule_candidates_at(
        &mut self,
        candidates: Vec<RuleCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let fresh = self.unraised(candidates)?;
        self.create_candidates(fresh, now)
    }

    fn create_candidates(
        &mut self,
        candidates: Vec<RuleCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        candidates
            .into_iter()
            .map(|candidate| self.create_alert_at(candidate.alert, now))
            .collect()
    }

    /// Drop candidates whose origin already has an alert.
    ///
    /// An existing alert with the same client, related type and related id
    /// (in any status) suppresses the candidate, so re-running a rule sweep
    /// is harmless and a resolved reminder stays resolved. Repeats within
    /// `candidates` are dropped too.
    fn unraised(&self, candidates: Vec<RuleCandidate>) -> Result<Vec<RuleCandidate>> {
        let existing = self.repo.list_alerts()?;
        let mut kept: Vec<RuleCandidate> = Vec::new();

        for candidate in candidates {
            let new = &candidate.alert;
            let same_origin = |client_id: &str, related_type: &Option<String>, related_id: &Option<String>| {
                client_id == new.client_id
                    && *related_type == new.related_type
                    && *related_id == new.related_id
            };
            let duplicate = existing
                .iter()
                .any(|a| same_origin(&a.client_id, &a.related_type, &a.related_id))
                || kept.iter().any(|k| {
                    same_origin(&k.alert.client_id, &k.alert.related_type, &k.alert.related_id)
                });
            if duplicate {
                debug!(
                    client_id = %new.client_id,
                    related_id = ?new.related_id,
                    "rule candidate already has an alert"
                );
                continue;
            }
            kept.push(candidate);
        }

        Ok(kept)
    }

    /// Persist `alert` if the stored copy is still in `expected` status at the
    /// same version, then advance the local version to match the store.
    fn write_back(&mut self, alert: &mut Alert, expected: AlertStatus) -> Result<()> {
        if self.repo.update_alert(alert, expected)? {
            alert.version = alert.version.wrapping_add(1);
            return Ok(());
        }
        match self.repo.get_alert(&alert.id)? {
            None => Err(CoreError::alert_not_found(&alert.id)),
            Some(current) => {
                warn!(
                    alert_id = %alert.id,
                    expected = %expected,
                    actual = %current.status,
                    version = alert.version,
                    stored_version = current.version,
                    "conditional alert update lost a race"
                );
                Err(CoreError::Conflict {
                    id: alert.id.clone(),
                })
            }
        }
    }
}

fn rejected(err: CoreError) -> CoreError {
    warn!(error = %err, "alert transition rejected");
    err
}
