// Background Workers
//
// The access simulator plays one portal user session against the real
// store: it keeps an analytics view open, clicks systems, and periodically
// refreshes to see how far the optimistic counts drifted from what was
// persisted. The system monitor keeps the window gauges current.

use anyhow::Result;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    database::Database,
    generators::DataGenerator,
    metrics::AppMetrics,
    models::{Profile, SystemInfo},
    view::AnalyticsView,
};

/// AccessSimulatorWorker drives one simulated analytics view
pub struct AccessSimulatorWorker {
    database: Arc<Database>,
    metrics: Arc<AppMetrics>,
    generator: Arc<DataGenerator>,
    view: AnalyticsView<Database>,
    profiles: Vec<Profile>,
    systems: Vec<SystemInfo>,
}

impl AccessSimulatorWorker {
    pub fn new(
        database: Arc<Database>,
        metrics: Arc<AppMetrics>,
        generator: Arc<DataGenerator>,
        window_days: u32,
    ) -> Self {
        let view = AnalyticsView::new(database.clone(), metrics.clone(), window_days);
        Self {
            database,
            metrics,
            generator,
            view,
            profiles: Vec::new(),
            systems: Vec::new(),
        }
    }

    pub async fn run(mut self, config: &Config) {
        if let Err(e) = self.reconcile().await {
            warn!("Simulator could not open its view: {}", e);
        }

        let refresh_every = config.refresh_every_ticks.max(1);
        let mut tick = 0u32;
        loop {
            sleep(Duration::from_secs(config.simulator_interval)).await;

            let tracked = self.run_tick(config.simulated_accesses_per_tick);
            debug!("Simulator tracked {} accesses", tracked);

            tick = tick.wrapping_add(1);
            if tick % refresh_every == 0 {
                if let Err(e) = self.reconcile().await {
                    warn!("Simulator refresh failed: {}", e);
                }
            }
        }
    }

    /// Track a batch of random accesses optimistically
    fn run_tick(&mut self, accesses: u32) -> u32 {
        let mut tracked = 0;
        for _ in 0..accesses {
            let Some((actor_id, target_id)) = self.generator.random_access(&self.profiles, &self.systems)
            else {
                break;
            };
            if self.view.track_access(actor_id, target_id) {
                tracked += 1;
            }
        }
        tracked
    }

    /// Reload the user/system pools and refresh the view, recording how far
    /// the authoritative total moved from the optimistic one
    async fn reconcile(&mut self) -> Result<()> {
        self.profiles = self.database.fetch_profiles().await?;
        self.systems = self.database.fetch_systems().await?;

        let optimistic = self.view.total_accesses() as i64;
        let had_rollup = self.view.rollup().is_some();
        self.view.refresh().await?;
        let refreshed = self.view.total_accesses() as i64;

        if had_rollup {
            let delta = refreshed - optimistic;
            self.metrics.reconcile_delta.set(delta);
            info!(
                "Simulator view refreshed: {} accesses ({:+} vs optimistic)",
                refreshed, delta
            );
        }
        Ok(())
    }
}

pub struct SystemMonitorWorker {
    database: Arc<Database>,
    metrics: Arc<AppMetrics>,
}

impl SystemMonitorWorker {
    pub fn new(database: Arc<Database>, metrics: Arc<AppMetrics>) -> Self {
        Self { database, metrics }
    }

    pub async fn update_window_metrics(&self, config: &Config) -> Result<()> {
        let accesses = self.database.count_recent_accesses(config.window_days).await?;
        self.metrics.window_accesses.set(accesses);

        let systems = self.database.fetch_systems().await?.len() as i64;
        self.metrics.cataloged_systems.set(systems);

        Ok(())
    }
}
