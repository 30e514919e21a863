// Launcher Analytics - usage analytics service for the link launcher portal
//
// Serves the analytics dashboard API over the access log store, optionally
// seeds demo data and runs a simulated portal session against it.

use anyhow::Result;
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use launcher_analytics::{
    api::{self, AppState},
    AccessSimulatorWorker, AppMetrics, Config, DataGenerator, Database, SystemMonitorWorker,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("launcher_analytics=info,sqlx=warn")),
        )
        .init();

    let config = Config::parse();
    info!("Starting launcher analytics");
    info!("Configuration:");
    info!("  - Window: {} days", config.window_days);
    info!("  - Top N: {}", config.top_n);
    info!("  - DB pool size: {}", config.db_pool_size);
    info!("  - Simulator: {}", config.enable_simulator);

    let database = Arc::new(Database::new(&config.database_url, config.db_pool_size).await?);
    let metrics = Arc::new(AppMetrics::new());
    let generator = Arc::new(DataGenerator::new());

    database.setup_schema().await?;
    if config.seed_demo_data {
        database.seed_demo_data(&generator, &config).await?;
    }

    let state = AppState {
        database: database.clone(),
        metrics: metrics.clone(),
        config: Arc::new(config.clone()),
    };

    tokio::spawn(start_system_monitor(state.clone()));

    if config.enable_simulator {
        tokio::spawn(start_access_simulator(state.clone(), generator.clone()));
    }

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    info!("===========================================");
    info!("Launcher Analytics Ready");
    info!("===========================================");
    info!("Usage endpoint: http://{}/api/analytics/usage", config.bind_address);
    info!("Metrics endpoint: http://{}/metrics", config.bind_address);
    info!("Health endpoint: http://{}/health", config.bind_address);
    info!("===========================================");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn start_access_simulator(state: AppState, generator: Arc<DataGenerator>) {
    let worker = AccessSimulatorWorker::new(
        state.database,
        state.metrics,
        generator,
        state.config.window_days,
    );

    // Give the API a moment to come up before the first fetch
    sleep(Duration::from_secs(2)).await;
    worker.run(&state.config).await;
}

async fn start_system_monitor(state: AppState) {
    let worker = SystemMonitorWorker::new(state.database, state.metrics);

    loop {
        if let Err(e) = worker.update_window_metrics(&state.config).await {
            error!("System monitor error: {}", e);
        }
        sleep(Duration::from_secs(state.config.monitor_interval)).await;
    }
}
