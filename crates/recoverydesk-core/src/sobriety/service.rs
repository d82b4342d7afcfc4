//! Persists check-ins and keeps each client's cached streak in step with its log.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::streak::{record_check_in, streak_summary, CheckInOutcome, StreakSummary};
use super::{NewCheckIn, SobrietyCheckIn, SobrietyMilestone};
use crate::clients::{Client, ClientFact};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::storage::SobrietyRepository;

pub struct SobrietyService<R> {
    repo: R,
    events: Vec<Event>,
}

impl<R: SobrietyRepository> SobrietyService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            events: Vec::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_inner(self) -> R {
        self.repo
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // === Clients ===

    pub fn add_client(
        &mut self,
        first_name: &str,
        last_name: &str,
        program_entry_date: Option<DateTime<Utc>>,
    ) -> Result<Client> {
        if first_name.trim().is_empty() && last_name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "first or last name is required").into());
        }
        let mut client = Client::new(first_name.trim(), last_name.trim());
        client.program_entry_date = program_entry_date;
        self.repo.insert_client(&client)?;
        info!(client_id = %client.id, "client added");
        Ok(client)
    }

    pub fn get_client(&self, id: &str) -> Result<Client> {
        self.repo
            .get_client(id)?
            .ok_or_else(|| CoreError::client_not_found(id))
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        self.repo.list_clients()
    }

    /// Set or clear one of the dated facts the reminder rules watch.
    pub fn set_client_fact(
        &mut self,
        id: &str,
        fact: ClientFact,
        value: Option<DateTime<Utc>>,
    ) -> Result<Client> {
        let mut client = self.get_client(id)?;
        client.set_fact(fact, value);
        self.save_client(&client)?;
        debug!(client_id = %id, fact = fact.as_str(), "client fact updated");
        Ok(client)
    }

    fn save_client(&mut self, client: &Client) -> Result<()> {
        if self.repo.update_client(client)? {
            Ok(())
        } else {
            Err(CoreError::client_not_found(&client.id))
        }
    }

    // === Check-ins ===

    pub fn record_check_in(&mut self, client_id: &str, entry: NewCheckIn) -> Result<CheckInOutcome> {
        self.record_check_in_at(client_id, entry, Utc::now())
    }

    /// Append a check-in and update the client's streak, all or nothing.
    pub fn record_check_in_at(
        &mut self,
        client_id: &str,
        entry: NewCheckIn,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        let mut client = self.get_client(client_id)?;
        let milestones = self.repo.list_milestones(client_id)?;

        let outcome = record_check_in(client_id, &client.streak, &milestones, entry, now);
        client.streak = outcome.state.clone();
        client.updated_at = now;

        self.repo
            .commit_check_in(&client, &outcome.entry, outcome.milestone.as_ref())?;

        info!(
            client_id,
            check_in_id = %outcome.entry.id,
            status = outcome.entry.status.as_str(),
            current_streak = outcome.state.current_streak,
            "check-in recorded"
        );
        self.events.push(Event::CheckInRecorded {
            client_id: client_id.to_string(),
            check_in_id: outcome.entry.id.clone(),
            status: outcome.entry.status,
            current_streak: outcome.state.current_streak,
            at: now,
        });
        if let Some(m) = &outcome.milestone {
            info!(client_id, days = m.days, "milestone achieved");
            self.events.push(Event::MilestoneAchieved {
                client_id: client_id.to_string(),
                days: m.days,
                at: now,
            });
        }

        Ok(outcome)
    }

    pub fn list_check_ins(&self, client_id: &str) -> Result<Vec<SobrietyCheckIn>> {
        self.get_client(client_id)?;
        self.repo.list_check_ins(client_id)
    }

    /// Notes are the only part of a logged check-in that can change.
    pub fn update_check_in_notes(&mut self, id: &str, notes: Option<&str>) -> Result<SobrietyCheckIn> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        if !self.repo.update_check_in_notes(id, notes)? {
            return Err(CoreError::check_in_not_found(id));
        }
        debug!(check_in_id = %id, "check-in notes updated");
        self.repo
            .get_check_in(id)?
            .ok_or_else(|| CoreError::check_in_not_found(id))
    }

    pub fn list_milestones(&self, client_id: &str) -> Result<Vec<SobrietyMilestone>> {
        self.get_client(client_id)?;
        self.repo.list_milestones(client_id)
    }

    pub fn streak_summary(&self, client_id: &str) -> Result<StreakSummary> {
        self.streak_summary_at(client_id, Utc::now())
    }

    pub fn streak_summary_at(&self, client_id: &str, now: DateTime<Utc>) -> Result<StreakSummary> {
        let client = self.get_client(client_id)?;
        let milestones = self.repo.list_milestones(client_id)?;
        Ok(streak_summary(
            client_id,
            &client.streak,
            client.program_entry_date,
            &milestones,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sobriety::CheckInStatus;
    use crate::storage::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn service() -> (SobrietyService<InMemoryStore>, String) {
        let mut svc = SobrietyService::new(InMemoryStore::new());
        let entry = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let client = svc.add_client("Jordan", "Reyes", Some(entry)).unwrap();
        (svc, client.id)
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn thirty_sober_then_relapse() {
        let (mut svc, id) = service();
        for n in 0..30 {
            svc.record_check_in_at(&id, NewCheckIn::sober(), day(n)).unwrap();
        }
        let relapse_on = day(30);
        svc.record_check_in_at(&id, NewCheckIn::relapse(relapse_on), relapse_on)
            .unwrap();

        let client = svc.get_client(&id).unwrap();
        assert_eq!(client.streak.current_streak, 0);
        assert_eq!(client.streak.longest_streak, 30);
        assert_eq!(client.streak.relapse_count, 1);
        assert_eq!(client.streak.last_relapse_date, Some(relapse_on));

        let milestones = svc.list_milestones(&id).unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].days, 30);
        assert_eq!(milestones[0].achieved_date, day(29));
        assert_eq!(svc.list_check_ins(&id).unwrap().len(), 31);
    }

    #[test]
    fn milestone_recorded_once_after_relapse() {
        let (mut svc, id) = service();
        for n in 0..30 {
            svc.record_check_in_at(&id, NewCheckIn::sober(), day(n)).unwrap();
        }
        svc.record_check_in_at(&id, NewCheckIn::relapse(day(30)), day(30))
            .unwrap();
        for n in 31..61 {
            svc.record_check_in_at(&id, NewCheckIn::sober(), day(n)).unwrap();
        }
        let days: Vec<u32> = svc
            .list_milestones(&id)
            .unwrap()
            .into_iter()
            .map(|m| m.days)
            .collect();
        assert_eq!(days, vec![30]);
    }

    #[test]
    fn events_follow_check_ins() {
        let (mut svc, id) = service();
        for n in 0..30 {
            svc.record_check_in_at(&id, NewCheckIn::sober(), day(n)).unwrap();
        }
        let events = svc.drain_events();
        assert_eq!(events.len(), 31);
        assert!(matches!(
            events.last(),
            Some(Event::MilestoneAchieved { days: 30, .. })
        ));
    }

    #[test]
    fn unknown_client_is_not_found() {
        let (mut svc, _) = service();
        let err = svc
            .record_check_in_at("missing", NewCheckIn::sober(), day(0))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(svc.streak_summary_at("missing", day(0)).unwrap_err().is_not_found());
    }

    #[test]
    fn notes_edit_only_touches_notes() {
        let (mut svc, id) = service();
        let outcome = svc
            .record_check_in_at(&id, NewCheckIn::sober(), day(0))
            .unwrap();

        let edited = svc
            .update_check_in_notes(&outcome.entry.id, Some("attended group"))
            .unwrap();
        assert_eq!(edited.notes.as_deref(), Some("attended group"));
        assert_eq!(edited.status, CheckInStatus::Sober);
        assert_eq!(edited.check_in_date, day(0));

        let cleared = svc.update_check_in_notes(&outcome.entry.id, Some("  ")).unwrap();
        assert!(cleared.notes.is_none());
        assert!(svc.update_check_in_notes("nope", None).unwrap_err().is_not_found());
    }

    #[test]
    fn summary_reports_progress() {
        let (mut svc, id) = service();
        for n in 0..3 {
            svc.record_check_in_at(&id, NewCheckIn::sober(), day(n)).unwrap();
        }
        let summary = svc.streak_summary_at(&id, day(9)).unwrap();
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.next_milestone, 30);
        assert_eq!(summary.check_ins_to_next_milestone, 27);
        assert_eq!(summary.days_in_program, 9);
    }

    #[test]
    fn add_client_requires_a_name() {
        let mut svc = SobrietyService::new(InMemoryStore::new());
        assert!(matches!(
            svc.add_client(" ", "", None),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn set_fact_persists() {
        let (mut svc, id) = service();
        let court = day(4);
        svc.set_client_fact(&id, ClientFact::CourtDate, Some(court)).unwrap();
        assert_eq!(svc.get_client(&id).unwrap().next_court_date, Some(court));
    }
}
