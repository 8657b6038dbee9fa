//! Metrics collection using Prometheus
//!
//! Counters and gauges for the queue, created matches and reported results,
//! plus timings of team composition and result application.

use crate::types::{MatchmakingMode, Side};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the in-house service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue metrics
    queue_metrics: QueueMetrics,

    /// Match and result metrics
    match_metrics: MatchMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Storage operation failures
    pub storage_errors_total: IntCounterVec,
}

/// Queue metrics
#[derive(Clone)]
pub struct QueueMetrics {
    pub joins_total: IntCounter,

    pub leaves_total: IntCounter,

    /// Join attempts refused (already queued or in a match)
    pub rejected_joins_total: IntCounterVec,

    /// Participants currently waiting
    pub queue_length: IntGauge,
}

/// Match metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Matches created by matchmaking mode
    pub matches_created_total: IntCounterVec,

    /// Composition attempts that produced no teams
    pub infeasible_compositions_total: IntCounterVec,

    /// Results applied by winning side
    pub results_reported_total: IntCounterVec,

    /// Matches dropped without a result
    pub matches_voided_total: IntCounter,

    /// Matches waiting for a result
    pub active_matches: IntGauge,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent composing teams
    pub composition_duration: HistogramVec,

    /// Time spent writing a result to storage
    pub result_application_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            match_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a participant joining the queue
    pub fn record_join(&self, queue_length: usize) {
        self.queue_metrics.joins_total.inc();
        self.queue_metrics.queue_length.set(queue_length as i64);
    }

    /// Record a refused join
    pub fn record_rejected_join(&self, reason: &str) {
        self.queue_metrics
            .rejected_joins_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a participant leaving the queue
    pub fn record_leave(&self, queue_length: usize) {
        self.queue_metrics.leaves_total.inc();
        self.queue_metrics.queue_length.set(queue_length as i64);
    }

    pub fn set_queue_length(&self, queue_length: usize) {
        self.queue_metrics.queue_length.set(queue_length as i64);
    }

    /// Record a composition attempt and how long it took
    pub fn record_composition(&self, mode: MatchmakingMode, duration: Duration) {
        self.performance_metrics
            .composition_duration
            .with_label_values(&[mode.as_str()])
            .observe(duration.as_secs_f64());
    }

    /// Record a match being created
    pub fn record_match_created(&self, mode: MatchmakingMode, active_matches: usize) {
        self.match_metrics
            .matches_created_total
            .with_label_values(&[mode.as_str()])
            .inc();
        self.match_metrics.active_matches.set(active_matches as i64);
    }

    /// Record a composition that could not produce teams
    pub fn record_infeasible(&self, reason: &str) {
        self.match_metrics
            .infeasible_compositions_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a result written to storage
    pub fn record_result(&self, winner: Side, active_matches: usize, duration: Duration) {
        let winner = match winner {
            Side::Blue => "blue",
            Side::Red => "red",
        };

        self.match_metrics
            .results_reported_total
            .with_label_values(&[winner])
            .inc();
        self.match_metrics.active_matches.set(active_matches as i64);
        self.performance_metrics
            .result_application_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a match dropped without a result
    pub fn record_void(&self, active_matches: usize) {
        self.match_metrics.matches_voided_total.inc();
        self.match_metrics.active_matches.set(active_matches as i64);
    }

    /// Record a failed storage operation
    pub fn record_storage_error(&self, operation: &str) {
        self.service_metrics
            .storage_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("inhouse_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "inhouse_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let storage_errors_total = IntCounterVec::new(
            Opts::new("inhouse_storage_errors_total", "Failed storage operations"),
            &["operation"],
        )?;
        registry.register(Box::new(storage_errors_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            storage_errors_total,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounter::new("inhouse_queue_joins_total", "Total queue joins")?;
        registry.register(Box::new(joins_total.clone()))?;

        let leaves_total = IntCounter::new("inhouse_queue_leaves_total", "Total queue leaves")?;
        registry.register(Box::new(leaves_total.clone()))?;

        let rejected_joins_total = IntCounterVec::new(
            Opts::new("inhouse_queue_rejected_joins_total", "Refused queue joins"),
            &["reason"],
        )?;
        registry.register(Box::new(rejected_joins_total.clone()))?;

        let queue_length =
            IntGauge::new("inhouse_queue_length", "Participants currently queued")?;
        registry.register(Box::new(queue_length.clone()))?;

        Ok(Self {
            joins_total,
            leaves_total,
            rejected_joins_total,
            queue_length,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_created_total = IntCounterVec::new(
            Opts::new("inhouse_matches_created_total", "Total matches created"),
            &["mode"],
        )?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let infeasible_compositions_total = IntCounterVec::new(
            Opts::new(
                "inhouse_infeasible_compositions_total",
                "Composition attempts without a valid split",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(infeasible_compositions_total.clone()))?;

        let results_reported_total = IntCounterVec::new(
            Opts::new("inhouse_results_reported_total", "Total results applied"),
            &["winner"],
        )?;
        registry.register(Box::new(results_reported_total.clone()))?;

        let matches_voided_total = IntCounter::new(
            "inhouse_matches_voided_total",
            "Matches dropped without a result",
        )?;
        registry.register(Box::new(matches_voided_total.clone()))?;

        let active_matches =
            IntGauge::new("inhouse_active_matches", "Matches waiting for a result")?;
        registry.register(Box::new(active_matches.clone()))?;

        Ok(Self {
            matches_created_total,
            infeasible_compositions_total,
            results_reported_total,
            matches_voided_total,
            active_matches,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let composition_duration = HistogramVec::new(
            HistogramOpts::new(
                "inhouse_composition_duration_seconds",
                "Team composition time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["mode"],
        )?;
        registry.register(Box::new(composition_duration.clone()))?;

        let result_application_duration = Histogram::with_opts(
            HistogramOpts::new(
                "inhouse_result_application_duration_seconds",
                "Time to write a match result",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(result_application_duration.clone()))?;

        Ok(Self {
            composition_duration,
            result_application_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(collector: &MetricsCollector) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&collector.registry().gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _queue = collector.queue();
        let _matches = collector.matches();
        let _performance = collector.performance();
    }

    #[test]
    fn test_queue_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_join(1);
        collector.record_join(2);
        collector.record_leave(1);
        collector.record_rejected_join("already_queued");

        assert_eq!(collector.queue().joins_total.get(), 2);
        assert_eq!(collector.queue().leaves_total.get(), 1);
        assert_eq!(collector.queue().queue_length.get(), 1);
        assert_eq!(
            collector
                .queue()
                .rejected_joins_total
                .with_label_values(&["already_queued"])
                .get(),
            1
        );
    }

    #[test]
    fn test_match_lifecycle_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_composition(MatchmakingMode::Balanced, Duration::from_micros(300));
        collector.record_match_created(MatchmakingMode::Balanced, 1);
        collector.record_infeasible("no_role_valid_split");
        collector.record_result(Side::Red, 0, Duration::from_millis(2));

        assert_eq!(
            collector
                .matches()
                .matches_created_total
                .with_label_values(&["balanced"])
                .get(),
            1
        );
        assert_eq!(collector.matches().active_matches.get(), 0);

        let text = render(&collector);
        assert!(text.contains("inhouse_results_reported_total{winner=\"red\"} 1"));
        assert!(text.contains("inhouse_composition_duration_seconds"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().unwrap();
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }
}
