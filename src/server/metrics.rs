use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all chajajwo metrics
const PREFIX: &str = "chajajwo";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Sync Metrics
    pub static ref SYNC_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_sync_runs_total"), "Sync attempts by category and outcome"),
        &["category", "status"]
    ).expect("Failed to create sync_runs_total metric");

    pub static ref SYNC_ITEMS_UPSERTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_sync_items_upserted_total"), "Rows written by the sync routine"),
        &["category"]
    ).expect("Failed to create sync_items_upserted_total metric");

    pub static ref SYNC_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_sync_duration_seconds"),
            "Duration of one sync attempt in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["category"]
    ).expect("Failed to create sync_duration_seconds metric");

    pub static ref SYNC_LAST_ITEMS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_sync_last_items"), "Items written by the last successful sync"),
        &["category"]
    ).expect("Failed to create sync_last_items metric");

    // Background Job Metrics
    pub static ref BACKGROUND_JOB_RUNNING: IntGaugeVec = IntGaugeVec::new(
        Opts::new(format!("{PREFIX}_background_job_running"), "Whether a background job is currently running"),
        &["job_id"]
    ).expect("Failed to create background_job_running metric");

    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job executions by outcome"),
        &["job_id", "outcome"]
    ).expect("Failed to create background_job_executions_total metric");

    // Read Path Metrics
    pub static ref LISTING_SOURCE_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_listing_source_total"), "Listing responses by serving stage"),
        &["category", "source"]
    ).expect("Failed to create listing_source_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_ITEMS_UPSERTED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_LAST_ITEMS.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LISTING_SOURCE_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record one sync attempt. `items` is only meaningful on success.
pub fn record_sync_run(category: &str, success: bool, items: usize, duration: Duration) {
    let status = if success { "success" } else { "error" };
    SYNC_RUNS_TOTAL.with_label_values(&[category, status]).inc();
    SYNC_DURATION_SECONDS
        .with_label_values(&[category])
        .observe(duration.as_secs_f64());

    if success {
        SYNC_ITEMS_UPSERTED_TOTAL
            .with_label_values(&[category])
            .inc_by(items as f64);
        SYNC_LAST_ITEMS
            .with_label_values(&[category])
            .set(items as f64);
    }
}

pub fn set_job_running(job_id: &str, running: bool) {
    BACKGROUND_JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1 } else { 0 });
}

pub fn record_job_execution(job_id: &str, outcome: &str) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, outcome])
        .inc();
}

pub fn record_listing_source(category: &str, source: &str) {
    LISTING_SOURCE_TOTAL
        .with_label_values(&[category, source])
        .inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
