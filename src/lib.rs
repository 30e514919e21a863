// Launcher Analytics Library
//
// Usage analytics for the internal link launcher portal: the access log
// store, the usage aggregator and its dashboard views, the HTTP API, and
// the demo data and traffic workers.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod database;
pub mod directory;
pub mod generators;
pub mod metrics;
pub mod models;
pub mod rankings;
pub mod view;
pub mod workers;

// Re-export commonly used types for convenience
pub use aggregator::{aggregate, apply_optimistic, AggregateStats, Rollup};
pub use config::Config;
pub use database::{AccessLogStore, Database};
pub use directory::{ProfileDirectory, SystemDirectory};
pub use generators::DataGenerator;
pub use metrics::AppMetrics;
pub use models::*;
pub use rankings::{densify_history, top_categories, top_systems, UsageReport};
pub use view::AnalyticsView;
pub use workers::*;
