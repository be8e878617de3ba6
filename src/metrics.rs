// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the extdns operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `extdns_firestoned_io_` (prometheus-safe version of "extdns.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Resource Lifecycle Metrics** - Track resource creation and updates
//!
//! # Example
//!
//! ```rust,no_run
//! use extdns::metrics::{record_reconciliation, ReconcileOutcome};
//!
//! record_reconciliation(ReconcileOutcome::Success, std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all extdns metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "extdns_firestoned_io";

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by status
///
/// Labels:
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of admission reviews by verdict
///
/// Labels:
/// - `verdict`: Outcome (`allowed`, `denied`)
pub static ADMISSION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_admission_reviews_total"),
        "Total number of admission reviews by verdict",
    );
    let counter = CounterVec::new(opts, &["verdict"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Outcome label for a finished reconciliation.
#[derive(Clone, Copy, Debug)]
pub enum ReconcileOutcome {
    /// The pass completed.
    Success,
    /// The pass failed and will be requeued.
    Error,
}

impl ReconcileOutcome {
    fn as_str(self) -> &'static str {
        match self {
            ReconcileOutcome::Success => "success",
            ReconcileOutcome::Error => "error",
        }
    }
}

/// Record one finished reconciliation with its duration.
pub fn record_reconciliation(outcome: ReconcileOutcome, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[outcome.as_str()])
        .observe(duration.as_secs_f64());
}

/// Record one admission review verdict.
pub fn record_admission(allowed: bool) {
    let verdict = if allowed { "allowed" } else { "denied" };
    ADMISSION_TOTAL.with_label_values(&[verdict]).inc();
}

/// Render the registry in the Prometheus text exposition format.
#[must_use]
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder
        .encode(&METRICS_REGISTRY.gather(), &mut buffer)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
