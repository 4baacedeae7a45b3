//! Sync service: the five protocol operations on top of the collection store.
//!
//! The service adds policy (payload ceiling, creation switch, deadlines) and
//! nothing else. Reads are abandoned when their deadline passes; mutations are
//! never abandoned mid-flight but hand the deadline to the store, which rolls
//! back instead of committing late. All synchronization happens inside
//! [`CollectionStore`], so a single `SyncService` can be shared by every
//! request handler.

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult, StoreError, StoreResult};
use crate::storage::{CollectionStore, NewCollection, PayloadSnapshot, UpdateOutcome};
use std::future::Future;
use std::time::{Duration, Instant};
use sync_types::api::{ServiceInfo, ServiceStatus};
use sync_types::{CollectionId, Timestamp, Version};

/// Protocol-level operations on bookmark collections.
#[derive(Debug, Clone)]
pub struct SyncService {
    store: CollectionStore,
    config: ServiceConfig,
}

impl SyncService {
    /// Create a service over `store` with the given policy.
    pub fn new(store: CollectionStore, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Describe the service to clients.
    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: if self.config.accept_new_collections {
                ServiceStatus::Online
            } else {
                ServiceStatus::NoNewCollections
            },
            message: self.config.message.clone(),
            max_sync_size: self.config.max_payload_bytes,
        }
    }

    /// Create a new, empty collection.
    pub async fn create(&self) -> ServiceResult<NewCollection> {
        if !self.config.accept_new_collections {
            return Err(ServiceError::CreationDisabled);
        }

        let created = self
            .store
            .create_before(self.deadline())
            .await
            .map_err(|e| mutation_error("create", e))?;
        tracing::info!("Created collection {:?}", created.id);
        Ok(created)
    }

    /// Fetch payload and version.
    pub async fn get_payload(&self, id: &CollectionId) -> ServiceResult<PayloadSnapshot> {
        self.with_deadline("get_payload", self.store.get_payload(id))
            .await
    }

    /// Fetch the current version.
    pub async fn get_version(&self, id: &CollectionId) -> ServiceResult<Version> {
        self.with_deadline("get_version", self.store.get_version(id))
            .await
    }

    /// Fetch the time of the last write.
    pub async fn get_last_updated(&self, id: &CollectionId) -> ServiceResult<Timestamp> {
        self.with_deadline("get_last_updated", self.store.get_last_updated(id))
            .await
    }

    /// Replace the payload.
    ///
    /// With `expected` set, the write only applies if it is still the current
    /// version; otherwise the caller gets a conflict carrying the version that
    /// won. Conflicts are never retried here.
    pub async fn update(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
    ) -> ServiceResult<UpdateOutcome> {
        let limit = self.config.max_payload_bytes;
        if payload.len() > limit {
            return Err(ServiceError::PayloadTooLarge {
                size: payload.len(),
                limit,
            });
        }

        let outcome = self
            .store
            .update_before(id, payload, expected, self.deadline())
            .await
            .map_err(|e| mutation_error("update", e))?;
        tracing::debug!(
            "Updated {:?} to {} ({} bytes)",
            id,
            outcome.version,
            payload.len()
        );
        Ok(outcome)
    }

    /// Absolute deadline for a mutation starting now.
    fn deadline(&self) -> Option<Instant> {
        self.config.request_timeout().map(|limit| Instant::now() + limit)
    }

    /// Run a read under the configured deadline. Only for reads: dropping a
    /// write future does not stop the statement it already sent.
    async fn with_deadline<T, F>(&self, operation: &'static str, call: F) -> ServiceResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match self.config.request_timeout() {
            Some(limit) => run_with_deadline(operation, limit, call).await,
            None => Ok(call.await?),
        }
    }
}

fn mutation_error(operation: &'static str, err: StoreError) -> ServiceError {
    match err {
        StoreError::DeadlineExceeded => {
            tracing::warn!("{} missed its deadline and was rolled back", operation);
            ServiceError::Timeout { operation }
        }
        other => other.into(),
    }
}

async fn run_with_deadline<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> ServiceResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!("{} exceeded deadline of {:?}", operation, limit);
            Err(ServiceError::Timeout { operation })
        }
    }
}
