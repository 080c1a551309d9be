//! Observability utilities for the pricing query engine.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Catalog metrics (cache behaviour, fetches, index builds, queries)
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, CatalogMetrics};
//!
//! init_metrics()?;
//!
//! CatalogMetrics::record_cache_hit("AmazonEC2", "us-east-1");
//!
//! let app = Router::new().route("/metrics", get(metrics_handler));
//! ```

pub mod catalog;
pub mod middleware;

pub use catalog::{CatalogMetrics, FetchOutcome, OperationTimer};
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Idempotent: later calls return the handle installed by the first one.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (None until `init_metrics` succeeded)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Catalog cache metrics
    describe_counter!(
        "catalog_cache_requests_total",
        "Catalog cache lookups by result (hit, miss, stale)"
    );
    describe_counter!(
        "catalog_cache_evictions_total",
        "Catalog entries evicted by the LRU policy"
    );
    describe_gauge!(
        "catalog_cache_entries",
        "Catalog indexes currently held in the cache"
    );

    // Fetch and build metrics
    describe_counter!(
        "catalog_fetches_total",
        "Bulk price list fetches by outcome"
    );
    describe_histogram!(
        "catalog_fetch_duration_seconds",
        "Bulk price list fetch duration in seconds"
    );
    describe_histogram!(
        "catalog_build_duration_seconds",
        "Catalog index build duration in seconds"
    );
    describe_gauge!(
        "catalog_records",
        "Price records in the most recently built index per service and region"
    );

    // Query metrics
    describe_counter!(
        "pricing_queries_total",
        "Pricing operations by operation and status"
    );
    describe_histogram!(
        "pricing_query_duration_seconds",
        "Pricing operation duration in seconds"
    );
}
