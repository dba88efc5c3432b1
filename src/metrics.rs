// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Cloud Foundry operator.
//!
//! All metrics carry the prefix `cloudfoundry_crossplane_io_` (prometheus-safe
//! version of the API group).
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - reconciliations, their duration and requeues
//! - **Resource Lifecycle Metrics** - CF resources created, updated and deleted
//! - **Error Metrics** - errors by kind and CF error reason
//! - **CF API Metrics** - HTTP requests sent to the CF API
//! - **Credential Rotation Metrics** - SCB rotations and retired-key deletions
//!
//! # Example
//!
//! ```rust,no_run
//! use cf_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Organization", std::time::Duration::from_secs(1));
//! ```

use crate::constants::METRICS_SERVER_PATH;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "cloudfoundry_crossplane_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry, exposed on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `Organization`, `App`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
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
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`error`, `not_ready`, `sync`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_created_total",
        "Total number of CF resources created by type",
        &["resource_type"],
    )
});

pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_updated_total",
        "Total number of CF resources updated by type",
        &["resource_type"],
    )
});

pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_deleted_total",
        "Total number of CF resources deleted by type",
        &["resource_type"],
    )
});

/// Number of CF resources created by this process and not yet deleted
pub static RESOURCES_ACTIVE: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_active"),
        "Number of currently active resources by type",
    );
    let gauge = GaugeVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: A `CF*` reason (e.g. `CFNotFound`), `Validation` or `Kubernetes`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// CF API Metrics
// ============================================================================

/// Total number of CF API requests
///
/// Labels:
/// - `method`: HTTP method
/// - `status`: HTTP status code, `0` when the request could not be sent
pub static CF_API_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "cf_api_requests_total",
        "Total number of CF API requests by method and status",
        &["method", "status"],
    )
});

// ============================================================================
// Credential Rotation Metrics
// ============================================================================

pub static SCB_ROTATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "scb_rotations_total",
        "Total number of service credential binding rotations by trigger",
        &["trigger"],
    )
});

pub static SCB_RETIRED_KEYS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "scb_retired_keys_deleted_total",
        "Total number of retired service keys deleted from CF by outcome",
        &["outcome"],
    )
});

// ============================================================================
// Helper Functions
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

/// Record a reconciliation requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
    RESOURCES_ACTIVE.with_label_values(&[resource_type]).inc();
}

pub fn record_resource_updated(resource_type: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
    RESOURCES_ACTIVE.with_label_values(&[resource_type]).dec();
}

/// Record an error
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record one CF API request. `status` is `0` when no response was received.
pub fn record_cf_api_request(method: &str, status: u16) {
    CF_API_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Record a binding rotation; `trigger` is `forced` or `scheduled`.
pub fn record_scb_rotation(trigger: &str) {
    SCB_ROTATIONS_TOTAL.with_label_values(&[trigger]).inc();
}

/// Record a retired-key delete; `outcome` is `deleted`, `gone` or `failed`.
pub fn record_retired_key_deletion(outcome: &str) {
    SCB_RETIRED_KEYS_DELETED_TOTAL
        .with_label_values(&[outcome])
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

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("cannot encode metrics: {e}"),
        ),
    }
}

/// Router serving the registry on [`METRICS_SERVER_PATH`].
pub fn router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

/// Serves `/metrics` on all interfaces until the process exits.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, path = METRICS_SERVER_PATH, "Serving metrics");
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";
        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        let resource_type = "TestResourceError";
        record_reconciliation_error(resource_type, Duration::from_millis(250));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_cf_api_request_by_status() {
        record_cf_api_request("GET", 404);
        record_cf_api_request("GET", 404);
        let counter = CF_API_REQUESTS_TOTAL.with_label_values(&["GET", "404"]);
        assert!(counter.get() >= 2.0);
    }

    #[test]
    fn test_record_rotation_metrics() {
        record_scb_rotation("forced");
        record_retired_key_deletion("gone");
        assert!(SCB_ROTATIONS_TOTAL.with_label_values(&["forced"]).get() > 0.0);
        assert!(
            SCB_RETIRED_KEYS_DELETED_TOTAL
                .with_label_values(&["gone"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("cloudfoundry_crossplane_io"));
        assert!(metrics_text.contains("reconciliations_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler_returns_text() {
        record_resource_created("HandlerTest");
        let (status, body) = metrics_handler().await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("resources_created_total"));
    }
}
