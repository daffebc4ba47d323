// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for search-sync.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! application chooses the exporter.
//!
//! # Metric Naming Convention
//! - `search_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `reason`: size, delay, manual
//! - `route`: bulk, query, direct

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a bulk flush and its batch size.
pub fn record_flush(reason: &str, count: usize) {
    counter!(
        "search_sync_bulk_flush_total",
        "reason" => reason.to_string()
    )
    .increment(1);
    histogram!(
        "search_sync_bulk_batch_size",
        "reason" => reason.to_string()
    )
    .record(count as f64);
}

/// Record end-to-end flush latency.
pub fn record_flush_seconds(reason: &str, duration: Duration) {
    histogram!(
        "search_sync_bulk_flush_seconds",
        "reason" => reason.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record one failing item inside a bulk response.
pub fn record_item_error() {
    counter!("search_sync_bulk_item_errors_total").increment(1);
}

/// Record a request-level bulk failure.
pub fn record_request_error() {
    counter!("search_sync_bulk_request_errors_total").increment(1);
}

/// Record which path an update took (bulk, query, direct).
pub fn record_update_route(route: &str) {
    counter!(
        "search_sync_update_route_total",
        "route" => route.to_string()
    )
    .increment(1);
}
