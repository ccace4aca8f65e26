//! # Sync Log Repository
//!
//! Replication bookkeeping: the idempotency ledger and per-stream
//! cursors.
//!
//! ## Idempotency Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         sync_log                                        │
//! │                                                                         │
//! │  remote record arrives ──► is_applied(sync_id)?                         │
//! │       │                         │                                       │
//! │       │ no                      │ yes ──► skip (duplicate delivery)     │
//! │       ▼                                                                 │
//! │  apply to local tables                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  record(entry) ── INSERT OR IGNORE on the UNIQUE sync_id               │
//! │                   (a concurrent duplicate loses the race harmlessly)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `applied` flag distinguishes "mutated local state" from
//! "deliberately skipped" (self-originated records, stale LWW losers,
//! duplicate ticket deliveries). Both kinds occupy the sync_id so the
//! record is never reconsidered.
//!
//! ## Cursors
//! One row per entity stream holding the last append-log id consumed.
//! `set_cursor` only ever moves forward; a cycle that reprocesses older
//! records (e.g. after a partial failure) cannot rewind it.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Row Types
// =============================================================================

/// A processed change record, as stored in the ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncLogEntry {
    /// Append-log key of the record (push id).
    pub sync_id: String,
    /// Entity discriminant from the record payload.
    pub entity_type: String,
    /// Action verb ("create", "update", "upsert", "delete").
    pub action: String,
    /// Branch that produced the record.
    pub origin_branch: String,
    /// Producer-side timestamp, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Whether applying the record mutated local state.
    pub applied: bool,
    /// Informational content hash of the record body.
    pub content_hash: String,
    /// When this branch processed the record.
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording a processed change.
#[derive(Debug, Clone)]
pub struct NewSyncLogEntry {
    pub sync_id: String,
    pub entity_type: String,
    pub action: String,
    pub origin_branch: String,
    pub timestamp_ms: i64,
    pub applied: bool,
    pub content_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the change log and per-stream cursors.
#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    pool: SqlitePool,
}

impl SyncLogRepository {
    /// Creates a new SyncLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncLogRepository { pool }
    }

    /// Returns true if this sync_id has already been processed.
    pub async fn is_applied(&self, sync_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_log WHERE sync_id = ?1")
            .bind(sync_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Records a processed change.
    ///
    /// ## Returns
    /// `true` if the row was inserted, `false` if the sync_id was
    /// already present (lost a race with a concurrent apply).
    pub async fn record(&self, entry: &NewSyncLogEntry) -> DbResult<bool> {
        let affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO sync_log
                (sync_id, entity_type, action, origin_branch, timestamp_ms,
                 applied, content_hash, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.sync_id)
        .bind(&entry.entity_type)
        .bind(&entry.action)
        .bind(&entry.origin_branch)
        .bind(entry.timestamp_ms)
        .bind(entry.applied)
        .bind(&entry.content_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(
            sync_id = %entry.sync_id,
            entity_type = %entry.entity_type,
            applied = entry.applied,
            inserted = affected > 0,
            "Recorded sync log entry"
        );
        Ok(affected > 0)
    }

    /// Fetches a ledger entry by sync_id.
    pub async fn get(&self, sync_id: &str) -> DbResult<Option<SyncLogEntry>> {
        let entry = sqlx::query_as::<_, SyncLogEntry>(
            r#"
            SELECT sync_id, entity_type, action, origin_branch, timestamp_ms,
                   applied, content_hash, recorded_at
            FROM sync_log
            WHERE sync_id = ?1
            "#,
        )
        .bind(sync_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Counts all ledger entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes ledger entries older than the given number of days.
    ///
    /// Housekeeping only. Pruned sync_ids lose their duplicate
    /// protection, so the retention window must comfortably exceed any
    /// plausible redelivery horizon.
    pub async fn prune_older_than(&self, days: i64) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(days);

        let pruned = sqlx::query("DELETE FROM sync_log WHERE recorded_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if pruned > 0 {
            debug!(pruned, days, "Pruned old sync log entries");
        }
        Ok(pruned)
    }

    // =========================================================================
    // Cursors
    // =========================================================================

    /// Fetches the last applied append-log id for a stream.
    pub async fn cursor(&self, stream: &str) -> DbResult<Option<String>> {
        let last_id: Option<String> =
            sqlx::query_scalar("SELECT last_id FROM sync_cursor WHERE stream = ?1")
                .bind(stream)
                .fetch_optional(&self.pool)
                .await?;

        Ok(last_id)
    }

    /// Advances a stream's cursor.
    ///
    /// Monotonic: push ids sort lexicographically by creation time, so
    /// an update only lands when the new id is strictly greater than
    /// the stored one. Setting a stale cursor is a silent no-op.
    pub async fn set_cursor(&self, stream: &str, last_id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursor (stream, last_id)
            VALUES (?1, ?2)
            ON CONFLICT (stream) DO UPDATE SET
                last_id = excluded.last_id
            WHERE excluded.last_id > sync_cursor.last_id
            "#,
        )
        .bind(stream)
        .bind(last_id)
        .execute(&self.pool)
        .await?;

        debug!(stream, last_id, "Cursor advanced");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
