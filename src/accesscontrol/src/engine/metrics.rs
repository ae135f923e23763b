//! Evaluation telemetry for the access control engine

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How an evaluation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Granted on unresolved scopes
    FastPathGrant,
    /// Granted after scope resolution
    ResolvedGrant,
    /// Denied after scope resolution
    Denied,
    /// Denied because no resolver covered the scopes
    ResolverMiss,
    /// Failed with an error
    Error,
}

/// Access control evaluation metrics
#[derive(Debug, Clone, Default)]
pub struct AccessMetrics {
    /// Total number of evaluations
    pub evaluations: u64,

    /// Grants decided on unresolved scopes
    pub fast_path_grants: u64,

    /// Grants decided after scope resolution
    pub resolved_grants: u64,

    /// Denials, resolver misses included
    pub denials: u64,

    /// Denials caused by a missing resolver
    pub resolver_misses: u64,

    /// Permission snapshots loaded from the store
    pub permission_loads: u64,

    /// Evaluations that returned an error
    pub error_count: u64,

    /// Latency percentiles
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl AccessMetrics {
    /// Share of grants decided without resolution
    pub fn fast_path_rate(&self) -> f64 {
        let grants = self.fast_path_grants + self.resolved_grants;
        if grants == 0 {
            0.0
        } else {
            self.fast_path_grants as f64 / grants as f64
        }
    }
}

/// Metrics collector
///
/// Counters are atomics. Latency samples sit behind the only lock, which
/// recording holds just long enough to push; averages and percentiles are
/// computed when metrics are read.
pub struct MetricsCollector {
    evaluations: AtomicU64,
    fast_path_grants: AtomicU64,
    resolved_grants: AtomicU64,
    denials: AtomicU64,
    resolver_misses: AtomicU64,
    permission_loads: AtomicU64,
    error_count: AtomicU64,

    /// Latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            evaluations: AtomicU64::new(0),
            fast_path_grants: AtomicU64::new(0),
            resolved_grants: AtomicU64::new(0),
            denials: AtomicU64::new(0),
            resolver_misses: AtomicU64::new(0),
            permission_loads: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record the outcome of one evaluation
    pub fn record_outcome(&self, outcome: Outcome) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let counter = match outcome {
            Outcome::FastPathGrant => &self.fast_path_grants,
            Outcome::ResolvedGrant => &self.resolved_grants,
            Outcome::Denied => &self.denials,
            Outcome::ResolverMiss => {
                self.denials.fetch_add(1, Ordering::Relaxed);
                &self.resolver_misses
            }
            Outcome::Error => &self.error_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permission snapshot load
    pub fn record_permission_load(&self) {
        self.permission_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record evaluation latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }
    }

    /// Get current metrics snapshot
    pub async fn get_metrics(&self) -> AccessMetrics {
        let mut sorted = self.latency_samples.read().await.clone();

        let mut metrics = AccessMetrics {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            fast_path_grants: self.fast_path_grants.load(Ordering::Relaxed),
            resolved_grants: self.resolved_grants.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            resolver_misses: self.resolver_misses.load(Ordering::Relaxed),
            permission_loads: self.permission_loads.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            ..Default::default()
        };

        if !sorted.is_empty() {
            let sum: f64 = sorted.iter().sum();
            metrics.avg_latency_ms = sum / sorted.len() as f64;

            sorted.sort_by(|a, b| a.total_cmp(b));
            metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
            metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
        }

        metrics
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        let mut samples = self.latency_samples.write().await;
        samples.clear();

        for counter in [
            &self.evaluations,
            &self.fast_path_grants,
            &self.resolved_grants,
            &self.denials,
            &self.resolver_misses,
            &self.permission_loads,
            &self.error_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics().await;

        format!(
            r#"# HELP access_evaluation_count Total number of access control evaluations
# TYPE access_evaluation_count counter
access_evaluation_count {}

# HELP access_evaluation_grants_total Granted evaluations by path
# TYPE access_evaluation_grants_total counter
access_evaluation_grants_total{{path="unresolved"}} {}
access_evaluation_grants_total{{path="resolved"}} {}

# HELP access_evaluation_denials_total Denied evaluations
# TYPE access_evaluation_denials_total counter
access_evaluation_denials_total {}

# HELP access_resolver_misses_total Denials caused by a missing scope resolver
# TYPE access_resolver_misses_total counter
access_resolver_misses_total {}

# HELP access_permission_loads_total Permission snapshots loaded from the store
# TYPE access_permission_loads_total counter
access_permission_loads_total {}

# HELP access_evaluation_duration_seconds Evaluation latency
# TYPE access_evaluation_duration_seconds summary
access_evaluation_duration_seconds{{quantile="0.5"}} {}
access_evaluation_duration_seconds{{quantile="0.99"}} {}

# HELP access_evaluation_errors_total Evaluations that failed
# TYPE access_evaluation_errors_total counter
access_evaluation_errors_total {}
"#,
            metrics.evaluations,
            metrics.fast_path_grants,
            metrics.resolved_grants,
            metrics.denials,
            metrics.resolver_misses,
            metrics.permission_loads,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
            metrics.error_count,
        )
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_outcomes() {
        let collector = MetricsCollector::new();

        collector.record_outcome(Outcome::FastPathGrant);
        collector.record_outcome(Outcome::FastPathGrant);
        collector.record_outcome(Outcome::ResolvedGrant);
        collector.record_outcome(Outcome::ResolverMiss);
        collector.record_outcome(Outcome::Denied);
        collector.record_outcome(Outcome::Error);

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.evaluations, 6);
        assert_eq!(metrics.fast_path_grants, 2);
        assert_eq!(metrics.resolved_grants, 1);
        assert_eq!(metrics.denials, 2);
        assert_eq!(metrics.resolver_misses, 1);
        assert_eq!(metrics.error_count, 1);
        assert!((metrics.fast_path_rate() - 0.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5)).await;
        collector.record_latency(Duration::from_millis(10)).await;
        collector.record_latency(Duration::from_millis(15)).await;

        let metrics = collector.get_metrics().await;
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms >= metrics.latency_p50_ms);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let collector = MetricsCollector::new();

        collector.record_outcome(Outcome::ResolvedGrant);
        collector.record_permission_load();

        let prometheus = collector.export_prometheus().await;
        assert!(prometheus.contains("access_evaluation_count 1"));
        assert!(prometheus.contains("access_evaluation_grants_total{path=\"resolved\"} 1"));
        assert!(prometheus.contains("access_permission_loads_total 1"));
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();

        collector.record_outcome(Outcome::Denied);
        collector.record_permission_load();
        collector.reset().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.evaluations, 0);
        assert_eq!(metrics.permission_loads, 0);
    }

    #[tokio::test]
    async fn test_percentiles_computed_on_read() {
        let collector = MetricsCollector::new();

        for ms in (1..=100).rev() {
            collector.record_latency(Duration::from_millis(ms)).await;
        }

        let metrics = collector.get_metrics().await;
        assert!((metrics.avg_latency_ms - 50.5).abs() < 0.01);
        assert!((metrics.latency_p50_ms - 51.0).abs() < 0.01);
        assert!((metrics.latency_p99_ms - 100.0).abs() < 0.01);

        let prometheus = collector.export_prometheus().await;
        assert!(prometheus.contains("access_evaluation_duration_seconds{quantile=\"0.99\"} 0.1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reset_concurrent_with_recording() {
        let collector = Arc::new(MetricsCollector::new());

        let recorders: Vec<_> = (0..4)
            .map(|_| {
                let collector = Arc::clone(&collector);
                tokio::spawn(async move {
                    for _ in 0..2_000 {
                        collector.record_outcome(Outcome::Denied);
                        collector.record_latency(Duration::from_micros(5)).await;
                    }
                })
            })
            .collect();

        let resetter = {
            let collector = Arc::clone(&collector);
            tokio::spawn(async move {
                for _ in 0..2_000 {
                    collector.reset().await;
                    collector.export_prometheus().await;
                }
            })
        };

        let all = async {
            for recorder in recorders {
                recorder.await.unwrap();
            }
            resetter.await.unwrap();
        };
        tokio::time::timeout(Duration::from_secs(10), all)
            .await
            .expect("recording and reset must not block each other");

        collector.reset().await;
        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.evaluations, 0);
        assert_eq!(metrics.avg_latency_ms, 0.0);
    }
}
