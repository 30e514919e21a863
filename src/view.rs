// Analytics View
//
// One open analytics view: it owns the rollup it displays and nothing else
// shares it. Opening or refreshing replaces the rollup wholesale from a
// fresh fetch of the window; tracking an access updates it optimistically
// and persists the access in the background.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{aggregate, apply_optimistic, Rollup};
use crate::database::AccessLogStore;
use crate::directory::{ProfileDirectory, SystemDirectory};
use crate::metrics::AppMetrics;
use crate::models::{AccessEvent, RawAccessEvent};
use crate::rankings::UsageReport;

pub struct AnalyticsView<S> {
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    window_days: u32,
    systems: SystemDirectory,
    profiles: ProfileDirectory,
    rollup: Option<Rollup>,
}

impl<S> AnalyticsView<S>
where
    S: AccessLogStore + 'static,
{
    pub fn new(store: Arc<S>, metrics: Arc<AppMetrics>, window_days: u32) -> Self {
        Self {
            store,
            metrics,
            window_days,
            systems: SystemDirectory::default(),
            profiles: ProfileDirectory::default(),
            rollup: None,
        }
    }

    /// Fetch the window and directories, then replace the held rollup.
    ///
    /// On a fetch failure the error is returned as is and whatever rollup
    /// the view already held stays displayed. Retrying is up to the caller.
    pub async fn refresh(&mut self) -> Result<&Rollup> {
        let fetch_start = Instant::now();
        let fetched = tokio::try_join!(
            self.store.load_window(self.window_days),
            self.store.load_systems(),
            self.store.load_profiles(),
        );
        let fetch_duration = fetch_start.elapsed().as_secs_f64();

        let (rows, systems, profiles) = match fetched {
            Ok(fetched) => {
                self.metrics.record_db_operation("access_window", "success", fetch_duration);
                fetched
            }
            Err(e) => {
                self.metrics.record_db_operation("access_window", "error", fetch_duration);
                warn!("Analytics fetch failed, keeping previous rollup: {}", e);
                return Err(e);
            }
        };

        let systems = SystemDirectory::new(systems);
        let mut profiles = ProfileDirectory::new(profiles);
        profiles.merge_missing(ProfileDirectory::from_rows(&rows));

        let events: Vec<RawAccessEvent> = rows.iter().map(RawAccessEvent::from).collect();

        let start = Instant::now();
        let rollup = aggregate(&events, &systems, &profiles);
        self.metrics.record_aggregation(
            &rollup.stats,
            rollup.actors.len(),
            start.elapsed().as_secs_f64(),
        );

        if rollup.stats.events_skipped > 0 {
            warn!(
                "Skipped {} malformed access events out of {}",
                rollup.stats.events_skipped,
                events.len()
            );
        }
        info!(
            "Aggregated {} accesses from {} users over the last {} days",
            rollup.stats.events_accepted,
            rollup.actors.len(),
            self.window_days
        );

        self.systems = systems;
        self.profiles = profiles;
        Ok(&*self.rollup.insert(rollup))
    }

    /// Alias of `refresh` for the first load
    pub async fn open(&mut self) -> Result<&Rollup> {
        self.refresh().await
    }

    /// Count an access the current user just made.
    ///
    /// The rollup is updated right away; the log write runs detached and is
    /// never awaited. If that write fails the optimistic count stays on
    /// screen until the next refresh, which is accepted: there is no retry
    /// and no rollback. Returns false for systems the view does not know.
    pub fn track_access(&mut self, actor_id: Uuid, target_id: Uuid) -> bool {
        if !self.systems.contains(&target_id) {
            debug!("Ignoring access to unknown system {}", target_id);
            return false;
        }

        let event = AccessEvent {
            actor_id,
            target_id,
            occurred_at: Utc::now(),
        };
        let rollup = self.rollup.get_or_insert_with(Rollup::default);
        rollup.actors = apply_optimistic(&rollup.actors, event, &self.systems, &self.profiles);
        self.metrics.optimistic_updates_total.inc();

        let store = self.store.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match store.append_access(actor_id, target_id).await {
                Ok(()) => metrics.record_access_write("optimistic", "success"),
                Err(e) => {
                    metrics.record_access_write("optimistic", "error");
                    warn!(
                        "Access write for user {} on {} failed, view stays optimistic: {}",
                        actor_id, target_id, e
                    );
                }
            }
        });

        true
    }

    pub fn rollup(&self) -> Option<&Rollup> {
        self.rollup.as_ref()
    }

    pub fn systems(&self) -> &SystemDirectory {
        &self.systems
    }

    /// Sum of accesses over every user in the held rollup
    pub fn total_accesses(&self) -> u64 {
        self.rollup
            .as_ref()
            .map(|r| r.actors.iter().map(|a| a.total_accesses).sum())
            .unwrap_or(0)
    }

    /// Dashboard payload for the held rollup (empty before the first load)
    pub fn report(&self, top_n: usize, sparkline_days: u32) -> UsageReport {
        let empty = Rollup::default();
        let rollup = self.rollup.as_ref().unwrap_or(&empty);
        UsageReport::build(rollup, &self.systems, top_n, Utc::now(), sparkline_days)
    }
}
