//! # Offline Queue
//!
//! Durable holding pen for change records produced while the remote is
//! unreachable.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Offline Queue                                    │
//! │                                                                         │
//! │  mutation ──► append to log ──✗ (offline)                              │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │              enqueue(stream, record) ──► pending_sync.json             │
//! │                                                                         │
//! │  next cycle (remote reachable):                                        │
//! │              load() ──► append each in FIFO order ──► store(rest)      │
//! │              (a mid-flush failure keeps the unsent suffix on disk)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Durability Discipline
//! Every operation re-reads the file before writing it back. Two
//! processes sharing a queue file is not supported, but within one
//! process this keeps the file authoritative: a crash never loses more
//! than the single change being written.
//!
//! The queue is bounded. At the cap the OLDEST entries are dropped
//! (with a warning): after a long partition the newest state is worth
//! more than a stale backlog, since products and suppliers are
//! last-write-wins anyway.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::SyncResult;
use sucursal_core::{ChangeRecord, EntityStream};

/// A change waiting for the remote to come back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedChange {
    /// Stream the record belongs on.
    pub stream: EntityStream,
    /// The full record, ready to append verbatim.
    pub record: ChangeRecord,
}

/// File-backed FIFO of unsent change records.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    path: PathBuf,
    cap: usize,
}

impl OfflineQueue {
    /// Creates a queue backed by the given file.
    ///
    /// The file is created lazily on first enqueue; a missing file
    /// reads as an empty queue.
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        OfflineQueue {
            path: path.into(),
            cap,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current queue contents, oldest first.
    pub fn load(&self) -> SyncResult<Vec<QueuedChange>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<QueuedChange> = serde_json::from_str(&raw)?;
        Ok(entries)
    }

    /// Overwrites the queue file with the given entries.
    ///
    /// An empty slice removes the file entirely, so a drained queue
    /// leaves no artifact behind.
    pub fn store(&self, entries: &[QueuedChange]) -> SyncResult<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Appends a change to the back of the queue.
    ///
    /// At the cap, the oldest entries are dropped to make room.
    pub fn enqueue(&self, stream: EntityStream, record: &ChangeRecord) -> SyncResult<()> {
        let mut entries = self.load()?;

        entries.push(QueuedChange {
            stream,
            record: record.clone(),
        });

        if entries.len() > self.cap {
            let dropped = entries.len() - self.cap;
            entries.drain(..dropped);
            warn!(
                dropped,
                cap = self.cap,
                "Offline queue full, dropped oldest entries"
            );
        }

        self.store(&entries)?;
        debug!(
            stream = %stream,
            queued = entries.len(),
            "Queued change for later delivery"
        );
        Ok(())
    }

    /// Number of queued changes.
    pub fn len(&self) -> SyncResult<usize> {
        Ok(self.load()?.len())
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.load()?.is_empty())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sucursal_core::{ChangeAction, ChangePayload, Product};

    fn product_record(barcode: &str) -> ChangeRecord {
        ChangeRecord::new(
            ChangeAction::Upsert,
            "Norte",
            ChangePayload::Product(Product {
                codigo_barra: barcode.to_string(),
                nombre: "Yerba 1kg".to_string(),
                precio_cents: 1250,
                categoria: None,
                last_modified_ms: 1,
            }),
        )
    }

    #[test]
    fn test_missing_file_is_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(dir.path().join("pending.json"), 100);

        assert!(queue.is_empty().unwrap());
        assert_eq!(queue.load().unwrap(), Vec::new());
    }

    #[test]
    fn test_enqueue_preserves_fifo_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(dir.path().join("pending.json"), 100);

        queue.enqueue(EntityStream::Products, &product_record("a")).unwrap();
        queue.enqueue(EntityStream::Products, &product_record("b")).unwrap();

        let entries = queue.load().unwrap();
        assert_eq!(entries.len(), 2);
        match &entries[0].record.payload {
            ChangePayload::Product(p) => assert_eq!(p.codigo_barra, "a"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_queue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");

        OfflineQueue::new(&path, 100)
            .enqueue(EntityStream::Sales, &product_record("a"))
            .unwrap();

        // A fresh handle (new process) sees the same entries.
        let reopened = OfflineQueue::new(&path, 100);
        assert_eq!(reopened.len().unwrap(), 1);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(dir.path().join("pending.json"), 2);

        queue.enqueue(EntityStream::Products, &product_record("a")).unwrap();
        queue.enqueue(EntityStream::Products, &product_record("b")).unwrap();
        queue.enqueue(EntityStream::Products, &product_record("c")).unwrap();

        let entries = queue.load().unwrap();
        assert_eq!(entries.len(), 2);
        match &entries[0].record.payload {
            ChangePayload::Product(p) => assert_eq!(p.codigo_barra, "b"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_drained_queue_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        let queue = OfflineQueue::new(&path, 100);

        queue.enqueue(EntityStream::Sales, &product_record("a")).unwrap();
        assert!(path.exists());

        queue.store(&[]).unwrap();
        assert!(!path.exists());
        assert!(queue.is_empty().unwrap());
    }
}
