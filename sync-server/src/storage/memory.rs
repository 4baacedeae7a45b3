//! In-memory storage backend.

use super::{expired, CollectionBackend, CollectionRecord, UpdateOutcome};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use sync_types::{CollectionId, Timestamp, Version};

/// Collections held in a sharded concurrent map.
///
/// Each operation holds the guard of a single entry and never awaits while
/// holding it, so writers to different collections only contend when their
/// keys share a shard. Nothing here blocks, so a deadline only matters when
/// it has already passed on entry.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: DashMap<CollectionId, CollectionRecord>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn insert(
        &self,
        record: &CollectionRecord,
        deadline: Option<Instant>,
    ) -> StoreResult<bool> {
        self.ensure_open()?;
        match self.collections.entry(record.id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(_) if expired(deadline) => Err(StoreError::DeadlineExceeded),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &CollectionId) -> StoreResult<Option<CollectionRecord>> {
        self.ensure_open()?;
        Ok(self.collections.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_version(&self, id: &CollectionId) -> StoreResult<Option<Version>> {
        self.ensure_open()?;
        Ok(self.collections.get(id).map(|entry| entry.version))
    }

    async fn get_last_updated(&self, id: &CollectionId) -> StoreResult<Option<Timestamp>> {
        self.ensure_open()?;
        Ok(self.collections.get(id).map(|entry| entry.last_updated))
    }

    async fn compare_and_swap(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> StoreResult<UpdateOutcome> {
        self.ensure_open()?;
        let mut entry = self
            .collections
            .get_mut(id)
            .ok_or(StoreError::NotFound { id: *id })?;

        if let Some(expected) = expected {
            if entry.version != expected {
                return Err(StoreError::VersionConflict {
                    id: *id,
                    expected,
                    current: entry.version,
                });
            }
        }

        if expired(deadline) {
            return Err(StoreError::DeadlineExceeded);
        }

        entry.payload = payload.to_string();
        entry.version = entry.version.next();
        entry.last_updated = entry.last_updated.max(now);

        Ok(UpdateOutcome {
            version: entry.version,
            last_updated: entry.last_updated,
        })
    }

    async fn count(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.collections.len() as u64)
    }

    async fn total_payload_bytes(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self
            .collections
            .iter()
            .map(|entry| entry.payload.len() as u64)
            .sum())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.collections.clear();
    }
}
