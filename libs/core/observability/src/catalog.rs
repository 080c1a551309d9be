//! Catalog-specific metrics for the pricing query engine.

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Outcome label for a bulk document fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    NotFound,
    Transport,
    Malformed,
}

impl FetchOutcome {
    fn as_label(self) -> &'static str {
        match self {
            FetchOutcome::Success => "success",
            FetchOutcome::NotFound => "not_found",
            FetchOutcome::Transport => "transport",
            FetchOutcome::Malformed => "malformed",
        }
    }
}

/// Catalog metrics recorder
pub struct CatalogMetrics;

impl CatalogMetrics {
    // =========================================================================
    // Cache Metrics
    // =========================================================================

    pub fn record_cache_hit(service_code: &str, region: &str) {
        Self::record_cache_lookup(service_code, region, "hit");
    }

    pub fn record_cache_miss(service_code: &str, region: &str) {
        Self::record_cache_lookup(service_code, region, "miss");
    }

    /// Record a stale entry being served after a failed refresh
    pub fn record_stale_served(service_code: &str, region: &str) {
        Self::record_cache_lookup(service_code, region, "stale");

        tracing::warn!(
            service_code = service_code,
            region = region,
            "Serving stale catalog after transport failure"
        );
    }

    fn record_cache_lookup(service_code: &str, region: &str, result: &'static str) {
        counter!(
            "catalog_cache_requests_total",
            "service" => service_code.to_string(),
            "region" => region.to_string(),
            "result" => result
        )
        .increment(1);
    }

    pub fn record_eviction(service_code: &str, region: &str) {
        counter!(
            "catalog_cache_evictions_total",
            "service" => service_code.to_string(),
            "region" => region.to_string()
        )
        .increment(1);
    }

    pub fn set_cache_entries(count: usize) {
        gauge!("catalog_cache_entries").set(count as f64);
    }

    // =========================================================================
    // Fetch / Build Metrics
    // =========================================================================

    pub fn record_fetch(service_code: &str, region: &str, outcome: FetchOutcome, duration: Duration) {
        counter!(
            "catalog_fetches_total",
            "service" => service_code.to_string(),
            "outcome" => outcome.as_label()
        )
        .increment(1);
        histogram!(
            "catalog_fetch_duration_seconds",
            "service" => service_code.to_string(),
            "region" => region.to_string()
        )
        .record(duration.as_secs_f64());
    }

    pub fn record_build(service_code: &str, region: &str, records: usize, duration: Duration) {
        histogram!(
            "catalog_build_duration_seconds",
            "service" => service_code.to_string()
        )
        .record(duration.as_secs_f64());
        gauge!(
            "catalog_records",
            "service" => service_code.to_string(),
            "region" => region.to_string()
        )
        .set(records as f64);

        tracing::info!(
            service_code = service_code,
            region = region,
            records = records,
            duration_ms = duration.as_millis() as u64,
            "Catalog index built"
        );
    }

    // =========================================================================
    // Query Metrics
    // =========================================================================

    pub fn record_operation(operation: &'static str, status: &'static str) {
        counter!(
            "pricing_queries_total",
            "operation" => operation,
            "status" => status
        )
        .increment(1);
    }
}

/// Timer guard for automatic duration recording.
///
/// Records into `pricing_query_duration_seconds` when `stop()` is called or when dropped.
pub struct OperationTimer {
    start: Instant,
    operation: &'static str,
    stopped: bool,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
            stopped: false,
        }
    }

    /// Stop the timer and record the duration. Returns duration in milliseconds.
    pub fn stop(&mut self) -> u64 {
        if self.stopped {
            return 0;
        }
        self.stopped = true;

        let duration = self.start.elapsed();
        histogram!("pricing_query_duration_seconds", "operation" => self.operation)
            .record(duration.as_secs_f64());

        duration.as_millis() as u64
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}
