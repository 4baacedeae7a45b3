//! SQLite storage backend for marksync-server.

use super::{expired, CollectionBackend, CollectionRecord, UpdateOutcome};
use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};
use sync_types::{CollectionId, Timestamp, Version};

/// SQLite-based collection storage.
///
/// Uses WAL mode for concurrent reads/writes. Each mutation runs in its own
/// transaction whose first statement is the write, so the writer lock is held
/// from the version check until commit or rollback. The deadline is checked
/// between the write and the commit.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) the database described by `config`.
    pub async fn open(config: &StorageConfig) -> StoreResult<Self> {
        Self::new(
            &config.database,
            config.max_connections,
            Duration::from_secs(config.busy_timeout_secs),
        )
        .await
    }

    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path, max_connections: u32, busy_timeout: Duration) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // A second connection would see a different empty database, and
        // closing this one drops the data.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                id TEXT PRIMARY KEY NOT NULL,
                payload TEXT NOT NULL,
                version INTEGER NOT NULL,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Classify a compare-and-swap that matched no row.
///
/// Runs inside the write transaction, so the row cannot change between the
/// failed update and this read.
async fn explain_miss(
    conn: &mut SqliteConnection,
    id: &CollectionId,
    expected: Option<Version>,
) -> StoreError {
    let current: Option<i64> =
        match sqlx::query_scalar("SELECT version FROM collections WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
        {
            Ok(current) => current,
            Err(e) => return e.into(),
        };

    match (current, expected) {
        (None, _) => StoreError::NotFound { id: *id },
        (Some(current), Some(expected)) => match decode_version(id, current) {
            Ok(current) => StoreError::VersionConflict {
                id: *id,
                expected,
                current,
            },
            Err(e) => e,
        },
        // An unconditional write only misses when the row is absent, and
        // rows are never deleted.
        (Some(_), None) => StoreError::CorruptRecord {
            id: id.to_string(),
            reason: "unconditional update matched no row".to_string(),
        },
    }
}

/// Commit, unless the deadline has passed; then roll back instead.
async fn commit_before(
    tx: Transaction<'static, Sqlite>,
    deadline: Option<Instant>,
) -> StoreResult<()> {
    if expired(deadline) {
        tx.rollback().await?;
        return Err(StoreError::DeadlineExceeded);
    }
    tx.commit().await?;
    Ok(())
}

#[async_trait]
impl CollectionBackend for SqliteBackend {
    async fn insert(
        &self,
        record: &CollectionRecord,
        deadline: Option<Instant>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO collections (id, payload, version, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.payload)
        .bind(encode_version(record.version))
        .bind(record.last_updated.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        commit_before(tx, deadline).await?;
        Ok(true)
    }

    async fn get(&self, id: &CollectionId) -> StoreResult<Option<CollectionRecord>> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r#"
            SELECT id, payload, version, last_updated
            FROM collections
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn get_version(&self, id: &CollectionId) -> StoreResult<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM collections WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        version.map(|v| decode_version(id, v)).transpose()
    }

    async fn get_last_updated(&self, id: &CollectionId) -> StoreResult<Option<Timestamp>> {
        let last_updated: Option<String> =
            sqlx::query_scalar("SELECT last_updated FROM collections WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        last_updated
            .map(|text| decode_timestamp(&id.to_string(), &text))
            .transpose()
    }

    async fn compare_and_swap(
        &self,
        id: &CollectionId,
        payload: &str,
        expected: Option<Version>,
        now: Timestamp,
        deadline: Option<Instant>,
    ) -> StoreResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;

        // Check and write in one statement. The text timestamps are fixed
        // width, so MAX() over them is chronological.
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            UPDATE collections
            SET payload = ?2,
                version = version + 1,
                last_updated = MAX(last_updated, ?3)
            WHERE id = ?1 AND (?4 IS NULL OR version = ?4)
            RETURNING version, last_updated
            "#,
        )
        .bind(id.to_string())
        .bind(payload)
        .bind(now.to_string())
        .bind(expected.map(encode_version))
        .fetch_optional(&mut *tx)
        .await?;

        match row {
            Some((version, last_updated)) => {
                let outcome = UpdateOutcome {
                    version: decode_version(id, version)?,
                    last_updated: decode_timestamp(&id.to_string(), &last_updated)?,
                };
                commit_before(tx, deadline).await?;
                Ok(outcome)
            }
            None => {
                let err = explain_miss(&mut *tx, id, expected).await;
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn total_payload_bytes(&self) -> StoreResult<u64> {
        let size: Option<i64> =
            sqlx::query_scalar("SELECT SUM(LENGTH(CAST(payload AS BLOB))) FROM collections")
                .fetch_one(&self.pool)
                .await?;

        Ok(size.unwrap_or(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn encode_version(version: Version) -> i64 {
    // SQLite integers are signed; versions never get near i64::MAX.
    i64::try_from(version.value()).unwrap_or(i64::MAX)
}

fn decode_version(id: &CollectionId, raw: i64) -> StoreResult<Version> {
    u64::try_from(raw)
        .map(Version::new)
        .map_err(|_| StoreError::CorruptRecord {
            id: id.to_string(),
            reason: format!("negative version {raw}"),
        })
}

fn decode_timestamp(id: &str, raw: &str) -> StoreResult<Timestamp> {
    raw.parse().map_err(|_| StoreError::CorruptRecord {
        id: id.to_string(),
        reason: format!("unparseable last_updated {raw:?}"),
    })
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: String,
    payload: String,
    version: i64,
    last_updated: String,
}

impl TryFrom<CollectionRow> for CollectionRecord {
    type Error = StoreError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        let id: CollectionId = row.id.parse().map_err(|_| StoreError::CorruptRecord {
            id: row.id.clone(),
            reason: "invalid id".to_string(),
        })?;

        Ok(CollectionRecord {
            id,
            payload: row.payload,
            version: decode_version(&id, row.version)?,
            last_updated: decode_timestamp(&row.id, &row.last_updated)?,
        })
    }
}
