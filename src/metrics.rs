// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the privatedns controller.
//!
//! All metrics live in a single registry exposed via the `/metrics` endpoint
//! and carry the `privatedns_` namespace prefix.

use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;

/// Namespace prefix for all controller metrics
const METRICS_NAMESPACE: &str = "privatedns";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Number of pod watchers currently running (one per live `PrivateDNS`
/// resource).
pub static WATCHERS_ACTIVE: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::with_opts(Opts::new(
        format!("{METRICS_NAMESPACE}_pod_watchers_active"),
        "Number of pod watchers currently running",
    ))
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Pods currently waiting for an address, by resource registry key.
pub static PENDING_PODS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_pending_pods"),
        "Pods currently waiting for an address, by resource",
    );
    let gauge = GaugeVec::new(opts, &["resource"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Total `PrivateDNS` resource events handled, by event kind.
pub static RESOURCE_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resource_events_total"),
        "Total PrivateDNS resource events handled, by event kind",
    );
    let counter = CounterVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total DNS changes submitted, by zone and outcome.
pub static DNS_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_changes_total"),
        "Total DNS changes submitted, by zone and outcome",
    );
    let counter = CounterVec::new(opts, &["zone", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total record ensure/delete operations performed by the pod watchers.
pub static RECORD_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_record_operations_total"),
        "Total record operations performed by the pod watchers, by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a handled resource event (`add`, `update`, `delete`).
pub fn record_resource_event(event: &str) {
    RESOURCE_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record a submitted DNS change and its outcome.
pub fn record_change_submitted(zone: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    DNS_CHANGES_TOTAL.with_label_values(&[zone, status]).inc();
}

/// Record a record-ensure or record-delete operation.
pub fn record_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    RECORD_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Render all registered metrics in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails or the output is not valid UTF-8.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
