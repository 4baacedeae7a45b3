//! Error types for marksync-server.

use sync_types::{CollectionId, Version};

/// Main error type for server startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Logging setup error.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collection store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No collection has this id.
    #[error("collection not found: {id:?}")]
    NotFound {
        /// The id that was looked up.
        id: CollectionId,
    },

    /// The caller's expected version does not match the stored one.
    ///
    /// The write was not applied.
    #[error("version conflict on {id:?}: expected {expected}, current {current}")]
    VersionConflict {
        /// The collection being written.
        id: CollectionId,
        /// Version the caller based its write on.
        expected: Version,
        /// Version currently stored.
        current: Version,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Every generated id was already taken.
    #[error("could not allocate a free collection id after {attempts} attempts")]
    IdSpaceExhausted {
        /// Number of ids tried.
        attempts: u32,
    },

    /// A stored row could not be decoded.
    #[error("corrupt record for {id}: {reason}")]
    CorruptRecord {
        /// Key of the row, as stored.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The identifier generator failed.
    #[error("id generation failed: {0}")]
    IdGeneration(#[from] sync_types::TypesError),

    /// The deadline passed before the mutation could commit.
    ///
    /// The mutation was rolled back.
    #[error("deadline passed before commit")]
    DeadlineExceeded,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

/// Sync service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payload exceeds the configured ceiling.
    #[error("payload too large: {size} bytes (limit: {limit} bytes)")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// New collections are not being accepted.
    #[error("creation of new collections is disabled")]
    CreationDisabled,

    /// The operation did not finish before its deadline and was not applied.
    #[error("{operation} timed out")]
    Timeout {
        /// Name of the operation.
        operation: &'static str,
    },
}

impl ServiceError {
    /// Stable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Store(StoreError::NotFound { .. }) => "NotFound",
            ServiceError::Store(StoreError::VersionConflict { .. }) => "VersionConflict",
            ServiceError::Store(StoreError::DeadlineExceeded) => "Timeout",
            ServiceError::Store(_) => "StorageError",
            ServiceError::PayloadTooLarge { .. } => "PayloadTooLarge",
            ServiceError::CreationDisabled => "CreationDisabled",
            ServiceError::Timeout { .. } => "Timeout",
        }
    }

    /// The stored version, when the error is a version conflict.
    pub fn current_version(&self) -> Option<Version> {
        match self {
            ServiceError::Store(StoreError::VersionConflict { current, .. }) => Some(*current),
            _ => None,
        }
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
