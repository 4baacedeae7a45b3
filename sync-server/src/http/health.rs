//! Health check endpoint.

use crate::server::SyncServer;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Overall status: `ok`, or `degraded` when storage cannot be queried.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Number of stored collections.
    pub collections: u64,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(server): Extension<Arc<SyncServer>>,
) -> (StatusCode, Json<HealthStatus>) {
    let (status, code, collections) = match server.service().store().count().await {
        Ok(count) => ("ok", StatusCode::OK, count),
        Err(e) => {
            tracing::warn!("Health check could not reach storage: {}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, 0)
        }
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            collections,
            uptime_seconds: server.uptime_seconds(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_serializes() {
        let status = HealthStatus {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            collections: 42,
            uptime_seconds: 3600,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"collections\":42"));
        assert!(json.contains("\"uptimeSeconds\":3600"));
    }
}
