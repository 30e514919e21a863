// Prometheus Metrics Collection
//
// This module defines and manages the Prometheus metrics for the analytics
// service: aggregation runs, skipped and relabeled events, access log
// writes, store latency and window-level gauges.

use prometheus::{
    CounterVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry,
};

use crate::aggregator::AggregateStats;

/// AppMetrics contains all Prometheus metrics for the application
pub struct AppMetrics {
    pub registry: Registry,

    // Aggregation
    pub aggregations_total: IntCounter,
    pub aggregation_duration: Histogram,
    pub events_aggregated_total: IntCounter,
    pub events_skipped_total: IntCounterVec,
    pub fallback_labels_total: IntCounterVec,
    pub rollup_actors: IntGauge,

    // Access tracking
    pub access_writes_total: CounterVec,
    pub optimistic_updates_total: IntCounter,
    pub reconcile_delta: IntGauge,

    // Store
    pub db_operation_duration: HistogramVec,

    // Window gauges
    pub window_accesses: IntGauge,
    pub cataloged_systems: IntGauge,
}

impl AppMetrics {
    /// Create a new metrics registry with all application metrics
    pub fn new() -> Self {
        let registry = Registry::new();

        let aggregations_total = IntCounter::new(
            "aggregations_total",
            "Total number of usage aggregation runs"
        ).unwrap();

        let aggregation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "aggregation_duration_seconds",
                "Time spent aggregating an access window"
            )
        ).unwrap();

        let events_aggregated_total = IntCounter::new(
            "events_aggregated_total",
            "Total number of access events counted into a rollup"
        ).unwrap();

        let events_skipped_total = IntCounterVec::new(
            Opts::new("events_skipped_total", "Malformed access events skipped by reason"),
            &["reason"]
        ).unwrap();

        let fallback_labels_total = IntCounterVec::new(
            Opts::new("fallback_labels_total", "Rollup entries labeled with a placeholder"),
            &["kind"] // actor/system
        ).unwrap();

        let rollup_actors = IntGauge::new(
            "rollup_actors",
            "Number of users in the most recent rollup"
        ).unwrap();

        let access_writes_total = CounterVec::new(
            Opts::new("access_writes_total", "Access log writes by origin and result"),
            &["origin", "result"] // api/optimistic, success/error
        ).unwrap();

        let optimistic_updates_total = IntCounter::new(
            "optimistic_updates_total",
            "Accesses applied optimistically to an open view"
        ).unwrap();

        let reconcile_delta = IntGauge::new(
            "reconcile_delta",
            "Difference between refetched and optimistic totals at the last refresh"
        ).unwrap();

        let db_operation_duration = HistogramVec::new(
            HistogramOpts::new("db_operation_duration_seconds", "Database operation latency"),
            &["query_type", "result"]
        ).unwrap();

        let window_accesses = IntGauge::new(
            "window_accesses",
            "Access log entries inside the analytics window"
        ).unwrap();

        let cataloged_systems = IntGauge::new(
            "cataloged_systems",
            "Number of systems in the catalog"
        ).unwrap();

        registry.register(Box::new(aggregations_total.clone())).unwrap();
        registry.register(Box::new(aggregation_duration.clone())).unwrap();
        registry.register(Box::new(events_aggregated_total.clone())).unwrap();
        registry.register(Box::new(events_skipped_total.clone())).unwrap();
        registry.register(Box::new(fallback_labels_total.clone())).unwrap();
        registry.register(Box::new(rollup_actors.clone())).unwrap();
        registry.register(Box::new(access_writes_total.clone())).unwrap();
        registry.register(Box::new(optimistic_updates_total.clone())).unwrap();
        registry.register(Box::new(reconcile_delta.clone())).unwrap();
        registry.register(Box::new(db_operation_duration.clone())).unwrap();
        registry.register(Box::new(window_accesses.clone())).unwrap();
        registry.register(Box::new(cataloged_systems.clone())).unwrap();

        Self {
            registry,
            aggregations_total,
            aggregation_duration,
            events_aggregated_total,
            events_skipped_total,
            fallback_labels_total,
            rollup_actors,
            access_writes_total,
            optimistic_updates_total,
            reconcile_delta,
            db_operation_duration,
            window_accesses,
            cataloged_systems,
        }
    }

    /// Record one aggregation run and what it skipped or relabeled
    pub fn record_aggregation(&self, stats: &AggregateStats, actors: usize, duration: f64) {
        self.aggregations_total.inc();
        self.aggregation_duration.observe(duration);
        self.events_aggregated_total.inc_by(stats.events_accepted);
        for (reason, count) in &stats.skipped_by_reason {
            self.events_skipped_total.with_label_values(&[reason.as_str()]).inc_by(*count);
        }
        self.fallback_labels_total.with_label_values(&["actor"]).inc_by(stats.unknown_actors);
        self.fallback_labels_total.with_label_values(&["system"]).inc_by(stats.unknown_systems);
        self.rollup_actors.set(actors as i64);
    }

    pub fn record_access_write(&self, origin: &str, result: &str) {
        self.access_writes_total.with_label_values(&[origin, result]).inc();
    }

    pub fn record_db_operation(&self, query_type: &str, result: &str, duration: f64) {
        self.db_operation_duration.with_label_values(&[query_type, result]).observe(duration);
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn aggregation_stats_land_in_registry() {
        let metrics = AppMetrics::new();
        let stats = AggregateStats {
            events_accepted: 10,
            events_skipped: 2,
            skipped_by_reason: BTreeMap::from([("missing_target".to_string(), 2)]),
            unknown_actors: 1,
            unknown_systems: 0,
        };

        metrics.record_aggregation(&stats, 4, 0.002);

        assert_eq!(metrics.aggregations_total.get(), 1);
        assert_eq!(metrics.events_aggregated_total.get(), 10);
        assert_eq!(
            metrics.events_skipped_total.with_label_values(&["missing_target"]).get(),
            2
        );
        assert_eq!(metrics.rollup_actors.get(), 4);

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"events_skipped_total".to_string()));
    }
}
