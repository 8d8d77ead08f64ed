// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the OpenSearch operator.
//!
//! All metrics carry the `opensearch_operator_` prefix and are exposed on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - passes, outcomes, durations and requeues
//! - **Resource Lifecycle Metrics** - child objects created by the subreconcilers
//! - **Scaler Metrics** - safe scale-down protocol transitions
//! - **Migration Metrics** - forward/reverse migration actions
//!
//! # Example
//!
//! ```rust,no_run
//! use opensearch_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("OpenSearchCluster", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "opensearch_operator";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).expect("valid counter definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `OpenSearchCluster`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).expect("valid histogram");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("histogram registered once");
    histogram
});

/// Total number of requeues by resource type and reason (`immediate`, `backoff`, `poll`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

/// Total number of errors by resource type and error kind
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "errors_total",
        "Total number of errors by resource type and error kind",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Total number of child resources created
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_created_total",
        "Total number of resources created by type",
        &["resource_type"],
    )
});

// ============================================================================
// Scaler and Migration Metrics
// ============================================================================

/// Scale protocol transitions by resulting state
///
/// Labels:
/// - `state`: `added`, `Running`, `Excluded`, `Drained`, `removed`, `Failed`, `cancelled`
pub static SCALER_TRANSITIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "scaler_transitions_total",
        "Safe scale protocol transitions by resulting state",
        &["state"],
    )
});

/// Migration actions by kind, direction and action
///
/// Labels:
/// - `kind`: migrated kind
/// - `direction`: `forward` (legacy to current) or `reverse`
/// - `action`: `create`, `sync`, `delete`
pub static MIGRATION_ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "migration_actions_total",
        "Migration actions by kind, direction and action",
        &["kind", "direction", "action"],
    )
});

// ============================================================================
// Helpers
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a requeue decision
pub fn record_requeue(resource_type: &str, reason: &str) {
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record an error of a given kind
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record creation of a child resource
pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a scaler transition
pub fn record_scaler_transition(state: &str) {
    SCALER_TRANSITIONS_TOTAL.with_label_values(&[state]).inc();
}

/// Record a migration action
pub fn record_migration_action(kind: &str, direction: &str, action: &str) {
    MIGRATION_ACTIONS_TOTAL
        .with_label_values(&[kind, direction, action])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
