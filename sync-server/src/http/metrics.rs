//! Prometheus metrics endpoint.

use crate::server::SyncServer;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(server): Extension<Arc<SyncServer>>) -> impl IntoResponse {
    let m = server.metrics();

    // Counters — monotonic since startup
    let creates = m.creates_total.load(Ordering::Relaxed);
    let payload_reads = m.payload_reads_total.load(Ordering::Relaxed);
    let metadata_reads = m.metadata_reads_total.load(Ordering::Relaxed);
    let updates = m.updates_total.load(Ordering::Relaxed);
    let conflicts = m.conflicts_total.load(Ordering::Relaxed);
    let not_found = m.not_found_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);
    let bytes_rx = m.bytes_received.load(Ordering::Relaxed);
    let bytes_tx = m.bytes_sent.load(Ordering::Relaxed);

    // Storage stats (best effort)
    let store = server.service().store();
    let collections = store.count().await.unwrap_or(0);
    let storage_bytes = store.total_payload_bytes().await.unwrap_or(0);
    let uptime = server.uptime_seconds();

    let body = format!(
        r#"# HELP marksync_info Server information
# TYPE marksync_info gauge
marksync_info{{version="{version}"}} 1

# HELP marksync_uptime_seconds Seconds since the server started
# TYPE marksync_uptime_seconds gauge
marksync_uptime_seconds {uptime}

# HELP marksync_creates_total Collections created
# TYPE marksync_creates_total counter
marksync_creates_total {creates}

# HELP marksync_payload_reads_total Payload fetches served
# TYPE marksync_payload_reads_total counter
marksync_payload_reads_total {payload_reads}

# HELP marksync_metadata_reads_total Version and last-updated polls served
# TYPE marksync_metadata_reads_total counter
marksync_metadata_reads_total {metadata_reads}

# HELP marksync_updates_total Updates applied
# TYPE marksync_updates_total counter
marksync_updates_total {updates}

# HELP marksync_conflicts_total Updates rejected with a version conflict
# TYPE marksync_conflicts_total counter
marksync_conflicts_total {conflicts}

# HELP marksync_not_found_total Requests for unknown collections
# TYPE marksync_not_found_total counter
marksync_not_found_total {not_found}

# HELP marksync_errors_total Requests failed for other reasons
# TYPE marksync_errors_total counter
marksync_errors_total {errors}

# HELP marksync_bytes_received_total Payload bytes received in updates
# TYPE marksync_bytes_received_total counter
marksync_bytes_received_total {bytes_rx}

# HELP marksync_bytes_sent_total Payload bytes sent in fetches
# TYPE marksync_bytes_sent_total counter
marksync_bytes_sent_total {bytes_tx}

# HELP marksync_storage_collections Number of stored collections
# TYPE marksync_storage_collections gauge
marksync_storage_collections {collections}

# HELP marksync_storage_bytes Total payload bytes in storage
# TYPE marksync_storage_bytes gauge
marksync_storage_bytes {storage_bytes}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
