//! Prometheus metrics for conciliacion-service.

use crate::models::Source;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for ingestion runs by source and outcome status.
pub static INGEST_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "conciliacion_ingest_runs_total",
        "Total number of ingestion runs",
        &["source", "status"]
    )
    .expect("Failed to register INGEST_RUNS")
});

/// Counter for ingested rows by source and row outcome.
pub static INGEST_ROWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "conciliacion_ingest_rows_total",
        "Total number of ingested rows",
        &["source", "outcome"]
    )
    .expect("Failed to register INGEST_ROWS")
});

/// Counter for report builds by report kind.
pub static REPORT_BUILDS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "conciliacion_report_builds_total",
        "Total number of report builds",
        &["report"]
    )
    .expect("Failed to register REPORT_BUILDS")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "conciliacion_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INGEST_RUNS);
    Lazy::force(&INGEST_ROWS);
    Lazy::force(&REPORT_BUILDS);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the outcome of an ingestion run.
pub fn record_ingest_run(source: Source, status: &str) {
    INGEST_RUNS
        .with_label_values(&[source.as_str(), status])
        .inc();
}

/// Record how many rows a run accepted and rejected.
pub fn record_ingest_rows(source: Source, processed: usize, failed: usize) {
    INGEST_ROWS
        .with_label_values(&[source.as_str(), "processed"])
        .inc_by(processed as f64);
    INGEST_ROWS
        .with_label_values(&[source.as_str(), "failed"])
        .inc_by(failed as f64);
}

/// Record a report build.
pub fn record_report_build(report: &str) {
    REPORT_BUILDS.with_label_values(&[report]).inc();
}
