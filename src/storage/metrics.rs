//! Metrics recording for store operations.

use std::time::Instant;

/// Records the outcome of one store operation.
///
/// Two metrics are emitted per call:
/// 1. `dedup_store_operations_total` - counter by operation and status
/// 2. `dedup_store_operation_duration_ms` - latency histogram
///
/// # Arguments
///
/// * `operation` - Operation name (e.g., "insert_or_increment", "get")
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - Operation status ("success" or "error")
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "dedup_store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "dedup_store_operation_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}
