//! Periodic snooze-expiry sweep.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use super::{Alert, AlertManager};
use crate::error::Result;
use crate::events::Event;
use crate::storage::AlertRepository;

/// Runs [`AlertManager::check_for_snooze_expiration`] on a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct SnoozeSweeper {
    interval: Duration,
}

impl SnoozeSweeper {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs.max(1)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sweep until `shutdown` completes. The first sweep runs immediately.
    ///
    /// `on_sweep` receives the alerts woken by each sweep together with the
    /// events drained from the manager. Returns the total number of alerts
    /// reactivated. A failing sweep is logged and the loop keeps going.
    pub async fn run<R, S, F>(
        &self,
        manager: &mut AlertManager<R>,
        shutdown: S,
        mut on_sweep: F,
    ) -> Result<usize>
    where
        R: AlertRepository,
        S: Future<Output = ()>,
        F: FnMut(&[Alert], Vec<Event>),
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_secs = self.interval.as_secs(), "snooze sweeper started");
        let mut total = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(reactivated = total, "snooze sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match manager.check_for_snooze_expiration() {
                        Ok(woken) => {
                            total += woken.len();
                            let events = manager.drain_events();
                            if !woken.is_empty() {
                                on_sweep(&woken, events);
                            }
                        }
                        Err(e) => error!(error = %e, "snooze sweep failed"),
                    }
                    debug!(total, "sweep tick");
                }
            }
        }

        Ok(total)
    }
}
