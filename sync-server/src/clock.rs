//! Time and identifier sources consumed by the collection store.

use std::sync::atomic::{AtomicI64, Ordering};
use sync_types::{CollectionId, Timestamp, TypesError};

/// Source of write timestamps.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock that never runs backwards within one process.
///
/// If the system clock steps back, the last returned instant is repeated
/// until real time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_millis: AtomicI64,
}

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_unix_millis();
        let previous = self.last_millis.fetch_max(wall, Ordering::AcqRel);
        let millis = previous.max(wall);
        Timestamp::from_unix_millis(millis).unwrap_or_else(Timestamp::now)
    }
}

/// Settable clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_unix_millis()),
        }
    }

    /// Move the clock to an arbitrary instant, including backwards.
    pub fn set(&self, ts: Timestamp) {
        self.millis.store(ts.as_unix_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let millis = self.millis.load(Ordering::SeqCst);
        Timestamp::from_unix_millis(millis).unwrap_or_else(Timestamp::now)
    }
}

/// Source of new collection ids.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id. Collisions must be negligible.
    fn generate(&self) -> Result<CollectionId, TypesError>;
}

/// Ids drawn from the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&self) -> Result<CollectionId, TypesError> {
        CollectionId::random()
    }
}
