//! Main SyncServer context.
//!
//! SyncServer owns everything a request handler needs: configuration, the
//! sync service and operational metrics. It is built once at startup, shared
//! behind an `Arc`, and shut down explicitly.

use crate::clock::{RandomIds, SystemClock};
use crate::config::{Config, StorageBackendKind};
use crate::error::{ServiceError, StoreError, StoreResult};
use crate::service::SyncService;
use crate::storage::{CollectionBackend, CollectionStore, MemoryBackend, SqliteBackend};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Operational metrics for monitoring server activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64` — no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Collections created.
    pub creates_total: AtomicU64,
    /// Payload fetches served.
    pub payload_reads_total: AtomicU64,
    /// Version and last-updated polls served.
    pub metadata_reads_total: AtomicU64,
    /// Updates applied.
    pub updates_total: AtomicU64,
    /// Updates rejected with a version conflict.
    pub conflicts_total: AtomicU64,
    /// Requests for ids that do not exist.
    pub not_found_total: AtomicU64,
    /// Requests failed for any other reason.
    pub errors_total: AtomicU64,
    /// Payload bytes received in updates.
    pub bytes_received: AtomicU64,
    /// Payload bytes sent in fetches.
    pub bytes_sent: AtomicU64,
}

impl ServerMetrics {
    /// Count a failed request under the matching counter.
    pub fn record_error(&self, err: &ServiceError) {
        let counter = match err {
            ServiceError::Store(StoreError::NotFound { .. }) => &self.not_found_total,
            ServiceError::Store(StoreError::VersionConflict { .. }) => &self.conflicts_total,
            _ => &self.errors_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Main server context.
pub struct SyncServer {
    config: Config,
    service: SyncService,
    /// Operational metrics (counters).
    metrics: ServerMetrics,
    started_at: Instant,
}

impl std::fmt::Debug for SyncServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SyncServer {
    /// Create a SyncServer around an existing service.
    pub fn new(config: Config, service: SyncService) -> Self {
        Self {
            config,
            service,
            metrics: ServerMetrics::default(),
            started_at: Instant::now(),
        }
    }

    /// Open the configured storage backend and build the server on top of it.
    pub async fn open(config: Config) -> StoreResult<Self> {
        let backend: Arc<dyn CollectionBackend> = match config.storage.backend {
            StorageBackendKind::Sqlite => {
                tracing::info!("Opening SQLite database {}", config.storage.database.display());
                Arc::new(SqliteBackend::open(&config.storage).await?)
            }
            StorageBackendKind::Memory => {
                tracing::warn!("Using in-memory storage; collections will not survive a restart");
                Arc::new(MemoryBackend::new())
            }
        };

        let store = CollectionStore::new(backend, Arc::new(SystemClock::new()), Arc::new(RandomIds));
        let service = SyncService::new(store, config.service.clone());
        Ok(Self::new(config, service))
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the sync service.
    pub fn service(&self) -> &SyncService {
        &self.service
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Seconds since the server was built.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Release storage. Called once, after the HTTP listener has drained.
    pub async fn shutdown(&self) {
        self.service.store().close().await;
        tracing::info!("Storage closed");
    }
}
