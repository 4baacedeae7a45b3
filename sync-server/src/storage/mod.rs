//! Storage layer for marksync-server.
//!
//! [`CollectionStore`] owns id allocation, version stamping and the
//! optimistic-concurrency check. The actual persistence is delegated to a
//! [`CollectionBackend`], whose `compare_and_swap` must apply the version
//! check and the write as one atomic step.
//!
//! Mutations take an optional deadline. Backends check it right before
//! committing and roll back once it has passed, so a mutation that reports
//! [`StoreError::DeadlineExceeded`] never took effect. Mutation futures are
//! not meant to be cancelled by the caller.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::clock::{Clock, IdGenerator};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use sync_types::{CollectionId, Timestamp, Version};

/// Whether `deadline` has passed.
pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// How many freshly generated ids `create` tries before giving up.
pub const MAX_CREATE_ATTEMPTS: u32 = 8;

/// The full stored state of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    /// Lookup key.
    pub id: CollectionId,
    /// Opaque client data.
    pub payload: String,
    /// Current version.
    pub version: Version,
    /// Time of the write that produced `version`.
    pub last_updated: Timestamp,
}

/// Result of a successful create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCollection {
    /// Identifier of the new collection.
    pub id: CollectionId,
    /// Its initial version.
    pub version: Version,
    /// Its creation time.
    pub last_updated: Timestamp,
}

/// Consistent snapshot of a collection's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSnapshot {
    /// Opaque client data.
    pub payload: String,
    /// Version the payload belongs to.
    pub version: Version,
}

/// Result of a successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Version produced by the write.
    pub version: Version,
    /// Time recorded for the write.
    pub last_updated: Timestamp,
}

/// Trait for collection storage backends.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Insert a record unless its id is taken.
    ///
    /// Returns `false` and leaves the existing record untouched if the id
    /// already exists. Fails with `DeadlineExceeded`, inserting nothing, if
    /// `deadline` passes before the insert commits.
    async fn insert(
        &self,
        record: &CollectionRecord,
        deadline: Option<Instant>,
    ) -> StoreResult<bool>;

    /// Get a full record.
    async fn get(&self, id: &CollectionId) -> StoreResult<Option<CollectionRecord>>;

    /// Get only the version of a record.
    async fn get_version(&self, id: &CollectionId) -> StoreResult<Option<Version>>;

    /// Get only the last-updated time of a record.
    async fn get_last_updated(&self, id: &CollectionId) -> StoreResult<Option<Timestamp>>;

    /// Atomically replace the payload if the version matches.
    ///
    /// With `expected = None` the version check is skipped. On success the
    /// version is incremented and `last_updated` becomes the later of `now`
    /// and its previous value. Fails with `NotFound`, `VersionConflict` or
    /// `DeadlineExceeded` without modifying anything.
    async fn compare_and_swap(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> StoreResult<UpdateOutcome>;

    /// Number of stored collections.
    async fn count(&self) -> StoreResult<u64>;

    /// Total size of all stored payloads in bytes.
    async fn total_payload_bytes(&self) -> StoreResult<u64>;

    /// Release resources. Every later call fails.
    async fn close(&self);
}

/// Collection store: the backend plus the clock and id source it stamps
/// records with.
#[derive(Clone)]
pub struct CollectionStore {
    backend: Arc<dyn CollectionBackend>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore").finish_non_exhaustive()
    }
}

impl CollectionStore {
    /// Create a store over `backend`.
    pub fn new(
        backend: Arc<dyn CollectionBackend>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { backend, clock, ids }
    }

    /// Allocate a new, empty collection.
    pub async fn create(&self) -> StoreResult<NewCollection> {
        self.create_before(None).await
    }

    /// Allocate a new, empty collection unless `deadline` passes first.
    pub async fn create_before(&self, deadline: Option<Instant>) -> StoreResult<NewCollection> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let record = CollectionRecord {
                id: self.ids.generate()?,
                payload: String::new(),
                version: Version::INITIAL,
                last_updated: self.clock.now(),
            };

            if self.backend.insert(&record, deadline).await? {
                return Ok(NewCollection {
                    id: record.id,
                    version: record.version,
                    last_updated: record.last_updated,
                });
            }

            tracing::warn!("Generated id {:?} already taken (attempt {})", record.id, attempt);
        }

        Err(StoreError::IdSpaceExhausted {
            attempts: MAX_CREATE_ATTEMPTS,
        })
    }

    /// Get payload and version as one snapshot.
    pub async fn get_payload(&self, id: &CollectionId) -> StoreResult<PayloadSnapshot> {
        self.backend
            .get(id)
            .await?
            .map(|record| PayloadSnapshot {
                payload: record.payload,
                version: record.version,
            })
            .ok_or(StoreError::NotFound { id: *id })
    }

    /// Get the current version.
    pub async fn get_version(&self, id: &CollectionId) -> StoreResult<Version> {
        self.backend
            .get_version(id)
            .await?
            .ok_or(StoreError::NotFound { id: *id })
    }

    /// Get the time of the last successful write.
    pub async fn get_last_updated(&self, id: &CollectionId) -> StoreResult<Timestamp> {
        self.backend
            .get_last_updated(id)
            .await?
            .ok_or(StoreError::NotFound { id: *id })
    }

    /// Replace the payload, optionally only if `expected` is still current.
    pub async fn update(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
    ) -> StoreResult<UpdateOutcome> {
        self.update_before(id, payload, expected, None).await
    }

    /// Like [`update`](Self::update), but rolled back if `deadline` passes
    /// before the write commits.
    pub async fn update_before(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
        deadline: Option<Instant>,
    ) -> StoreResult<UpdateOutcome> {
        let now = self.clock.now();
        self.backend
            .compare_and_swap(id, payload, expected, now, deadline)
            .await
    }

    /// Number of stored collections.
    pub async fn count(&self) -> StoreResult<u64> {
        self.backend.count().await
    }

    /// Total size of all stored payloads in bytes.
    pub async fn total_payload_bytes(&self) -> StoreResult<u64> {
        self.backend.total_payload_bytes().await
    }

    /// Close the backend.
    pub async fn close(&self) {
        self.backend.close().await;
    }
}
