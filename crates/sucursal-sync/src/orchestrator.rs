//! # Sync Orchestrator
//!
//! Drives replication for one branch: publishes local mutations to the
//! append log and applies remote records to the local store.
//!
//! ## Cycle Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         run_cycle()                                     │
//! │                                                                         │
//! │  1. health_check ──✗ unreachable ──► summary error, nothing attempted   │
//! │  2. flush offline queue (FIFO; a failure keeps the unsent suffix,       │
//! │     and the file is re-read before rewrite so a concurrent enqueue      │
//! │     is never lost)                                                      │
//! │  3. for each stream (ventas, productos, proveedores):                   │
//! │       cursor ◄── sync_cursor table                                      │
//! │       read_from(stream, cursor)                                         │
//! │       for each (sync_id, raw) in log order:                             │
//! │         already in sync_log? ──► skip                                   │
//! │         parse ──✗ malformed ──► count error, keep going                 │
//! │         self-originated? ──► ledger row (applied=false), skip           │
//! │         apply (insert / replace / LWW upsert / tombstone)               │
//! │         ledger row with the apply outcome                               │
//! │       advance cursor to the highest id read                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One bad record never aborts a cycle: errors are counted and the
//! cursor still advances, so the stream cannot wedge on a poisoned
//! entry. Cross-stream there is no ordering at all; a sales backlog
//! does not delay product pulls.

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::packager::ChangePackager;
use crate::queue::OfflineQueue;
use crate::resolver::{resolve_upsert, Resolution};
use crate::transport::{AppendLog, LogHealth};
use sucursal_core::{
    ChangePayload, ChangeRecord, EntityStream, Product, Sale, SaleItem, Supplier,
};
use sucursal_db::{Database, NewSyncLogEntry};

// =============================================================================
// Cycle Summary
// =============================================================================

/// Outcome of one sync cycle, surfaced to the caller (status line,
/// scheduler log).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Queued changes successfully pushed to the log.
    pub sent: usize,
    /// Remote records applied to local state.
    pub received: usize,
    /// Per-record failure messages (the cycle continued past each).
    pub errors: Vec<String>,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sent={} received={} errors={}",
            self.sent,
            self.received,
            self.errors.len()
        )
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Replication engine for one branch.
///
/// Generic over the log transport so tests drive two orchestrators
/// against one in-process log exactly the way two branches share one
/// remote.
pub struct SyncOrchestrator<L: AppendLog> {
    config: SyncConfig,
    db: Database,
    log: L,
    packager: ChangePackager,
    queue: OfflineQueue,
}

impl<L: AppendLog> SyncOrchestrator<L> {
    /// Creates an orchestrator from a validated config.
    pub fn new(config: SyncConfig, db: Database, log: L) -> SyncResult<Self> {
        config.validate()?;

        let packager = ChangePackager::new(&config.branch.name, config.branch.ticket_parity)?;
        let queue = OfflineQueue::new(config.queue_path()?, config.sync.queue_cap);

        Ok(SyncOrchestrator {
            config,
            db,
            log,
            packager,
            queue,
        })
    }

    /// The branch this orchestrator replicates for.
    pub fn branch(&self) -> &str {
        self.packager.branch()
    }

    /// The offline queue (for diagnostics).
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    // =========================================================================
    // Mutation Hooks
    // =========================================================================
    // The interactive layer calls one of these AFTER committing the
    // mutation locally. Publication is best-effort: an unreachable
    // remote lands the record in the offline queue, never in an Err.

    /// Publishes a finalized sale.
    pub async fn record_sale(&self, sale: &Sale, items: &[SaleItem]) -> SyncResult<()> {
        if !self.config.sync.enabled {
            return Ok(());
        }
        let record = self.packager.sale_created(sale, items)?;
        self.publish(record).await
    }

    /// Publishes a sale return (item correction).
    pub async fn record_return(
        &self,
        numero_ticket: i64,
        total_cents: i64,
        items: &[SaleItem],
    ) -> SyncResult<()> {
        if !self.config.sync.enabled {
            return Ok(());
        }
        let record = self.packager.sale_returned(numero_ticket, total_cents, items)?;
        self.publish(record).await
    }

    /// Publishes a product save.
    pub async fn record_product(&self, product: &Product) -> SyncResult<()> {
        if !self.config.sync.enabled || !self.config.sync.sync_products {
            return Ok(());
        }
        let record = self.packager.product_saved(product)?;
        self.publish(record).await
    }

    /// Publishes a product deletion.
    pub async fn record_product_delete(&self, codigo_barra: &str) -> SyncResult<()> {
        if !self.config.sync.enabled || !self.config.sync.sync_products {
            return Ok(());
        }
        let record = self.packager.product_deleted(codigo_barra)?;
        self.publish(record).await
    }

    /// Publishes a supplier save.
    pub async fn record_supplier(&self, supplier: &Supplier) -> SyncResult<()> {
        if !self.config.sync.enabled || !self.config.sync.sync_suppliers {
            return Ok(());
        }
        let record = self.packager.supplier_saved(supplier)?;
        self.publish(record).await
    }

    /// Publishes a supplier deletion.
    pub async fn record_supplier_delete(&self, nombre: &str) -> SyncResult<()> {
        if !self.config.sync.enabled || !self.config.sync.sync_suppliers {
            return Ok(());
        }
        let record = self.packager.supplier_deleted(nombre)?;
        self.publish(record).await
    }

    async fn publish(&self, record: ChangeRecord) -> SyncResult<()> {
        let stream = record.stream();
        match self.log.append(stream, &record).await {
            Some(sync_id) => {
                debug!(stream = %stream, sync_id = %sync_id, "Published change");
                Ok(())
            }
            None => {
                warn!(stream = %stream, "Remote unavailable, queueing change");
                self.queue.enqueue(stream, &record)
            }
        }
    }

    // =========================================================================
    // Sync Cycle
    // =========================================================================

    /// Runs one full push/pull cycle.
    pub async fn run_cycle(&self) -> SyncResult<CycleSummary> {
        let mut summary = CycleSummary::default();

        if !self.config.sync.enabled {
            debug!("Sync disabled, skipping cycle");
            return Ok(summary);
        }

        // A failed probe skips the cycle but is still visible in the
        // summary: "could not check" must never read like a healthy
        // idle cycle.
        match self.log.health_check().await {
            LogHealth::Reachable => {}
            health => {
                warn!(?health, "Remote not reachable, skipping cycle");
                summary.errors.push(match health {
                    LogHealth::BadCredentials => "remote rejected credentials".to_string(),
                    LogHealth::NotFound => "remote store path not found".to_string(),
                    _ => "remote unreachable".to_string(),
                });
                return Ok(summary);
            }
        }

        summary.sent = self.flush_queue().await?;

        for stream in EntityStream::ALL {
            if !self.stream_enabled(stream) {
                continue;
            }
            // A broken stream (including local-store failures) is a
            // summary entry; the remaining streams still run.
            if let Err(e) = self.pull_stream(stream, &mut summary).await {
                warn!(stream = %stream, error = %e, "Stream pull failed");
                summary.errors.push(format!("{stream}: {e}"));
            }
        }

        info!(%summary, branch = %self.branch(), "Sync cycle complete");
        Ok(summary)
    }

    fn stream_enabled(&self, stream: EntityStream) -> bool {
        match stream {
            EntityStream::Sales => true,
            EntityStream::Products => self.config.sync.sync_products,
            EntityStream::Suppliers => self.config.sync.sync_suppliers,
        }
    }

    /// Pushes queued changes in FIFO order.
    ///
    /// Stops at the first failed append rather than attempting the
    /// rest: publishing record N+1 before record N would reorder one
    /// branch's changes on the shared log. The unsent suffix stays
    /// queued for the next cycle.
    ///
    /// The queue file is re-read before the rewrite. Enqueue only ever
    /// appends, so the just-sent entries are still the file's prefix
    /// and a record enqueued while the sends were in flight survives
    /// in the retained tail.
    async fn flush_queue(&self) -> SyncResult<usize> {
        let entries = self.queue.load()?;
        if entries.is_empty() {
            return Ok(0);
        }

        info!(pending = entries.len(), "Flushing offline queue");

        let mut sent = 0;
        for entry in &entries {
            if self.log.append(entry.stream, &entry.record).await.is_none() {
                warn!(sent, remaining = entries.len() - sent, "Remote dropped mid-flush");
                break;
            }
            sent += 1;
        }

        let current = self.queue.load()?;
        self.queue.store(&current[sent.min(current.len())..])?;
        Ok(sent)
    }

    /// Pulls and applies one stream from its cursor.
    async fn pull_stream(&self, stream: EntityStream, summary: &mut CycleSummary) -> SyncResult<()> {
        let sync_log = self.db.sync_log();
        let cursor = sync_log.cursor(stream.as_str()).await?;

        let records = match self.log.read_from(stream, cursor.as_deref()).await {
            Some(records) => records,
            None => {
                warn!(stream = %stream, "Read failed, stream skipped this cycle");
                summary.errors.push(format!("{stream}: read failed"));
                return Ok(());
            }
        };

        if records.is_empty() {
            return Ok(());
        }

        debug!(stream = %stream, count = records.len(), "Applying remote records");

        // BTreeMap iterates in key order, so the last key is the
        // highest id read. The cursor advances past malformed records
        // too; a poisoned entry must not wedge the stream.
        let mut last_id: Option<String> = None;

        for (sync_id, raw) in records {
            last_id = Some(sync_id.clone());

            if sync_log.is_applied(&sync_id).await? {
                continue;
            }

            let record: ChangeRecord = match serde_json::from_value(raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(stream = %stream, sync_id = %sync_id, error = %e, "Malformed record skipped");
                    summary.errors.push(format!("{stream}/{sync_id}: malformed record: {e}"));
                    continue;
                }
            };

            let self_originated = record.origin_branch == self.branch();
            let applied = if self_originated {
                debug!(sync_id = %sync_id, "Own record echoed back, not applied");
                false
            } else {
                match self.apply_record(&record).await {
                    Ok(applied) => applied,
                    Err(e) => {
                        warn!(stream = %stream, sync_id = %sync_id, error = %e, "Apply failed, record skipped");
                        summary.errors.push(format!("{stream}/{sync_id}: apply failed: {e}"));
                        continue;
                    }
                }
            };

            sync_log
                .record(&NewSyncLogEntry {
                    sync_id,
                    entity_type: record.payload.entity_type().to_string(),
                    action: record.action.to_string(),
                    origin_branch: record.origin_branch.clone(),
                    timestamp_ms: record.timestamp_ms,
                    applied,
                    content_hash: record.content_hash(),
                })
                .await?;

            if applied {
                summary.received += 1;
            }
        }

        if let Some(last_id) = last_id {
            sync_log.set_cursor(stream.as_str(), &last_id).await?;
        }
        Ok(())
    }

    /// Applies one remote record to local state.
    ///
    /// Returns whether local state actually changed; deliberate skips
    /// (duplicate ticket, stale LWW loser, absent tombstone target)
    /// return `false`.
    async fn apply_record(&self, record: &ChangeRecord) -> SyncResult<bool> {
        match &record.payload {
            ChangePayload::Sale(payload) => {
                let sales = self.db.sales();
                if sales.exists(payload.numero_ticket).await? {
                    debug!(
                        numero_ticket = payload.numero_ticket,
                        "Sale already present, duplicate delivery skipped"
                    );
                    return Ok(false);
                }

                let sale = Sale {
                    numero_ticket: payload.numero_ticket,
                    fecha: payload.fecha,
                    total_cents: payload.total_cents,
                    origin_branch: record.origin_branch.clone(),
                };
                match sales.insert_with_items(&sale, &payload.items).await {
                    Ok(()) => Ok(true),
                    // Lost an exists/insert race with a concurrent writer.
                    Err(e) if e.is_unique_violation() => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }

            ChangePayload::SaleUpdate(payload) => {
                let replaced = self
                    .db
                    .sales()
                    .replace_items(payload.numero_ticket, payload.total_cents, &payload.items)
                    .await?;
                Ok(replaced)
            }

            ChangePayload::Product(incoming) => {
                let products = self.db.products();
                let local_ts = products
                    .get(&incoming.codigo_barra)
                    .await?
                    .map(|p| p.last_modified_ms);

                match resolve_upsert(local_ts, incoming.last_modified_ms) {
                    Resolution::Apply => {
                        products.upsert(incoming).await?;
                        Ok(true)
                    }
                    Resolution::KeepLocal => Ok(false),
                }
            }

            ChangePayload::ProductDelete(payload) => {
                Ok(self.db.products().delete(&payload.codigo_barra).await?)
            }

            ChangePayload::Supplier(incoming) => {
                let suppliers = self.db.suppliers();
                let local_ts = suppliers
                    .get(&incoming.nombre)
                    .await?
                    .map(|s| s.last_modified_ms);

                match resolve_upsert(local_ts, incoming.last_modified_ms) {
                    Resolution::Apply => {
                        suppliers.upsert(incoming).await?;
                        Ok(true)
                    }
                    Resolution::KeepLocal => Ok(false),
                }
            }

            ChangePayload::SupplierDelete(payload) => {
                Ok(self.db.suppliers().delete(&payload.nombre).await?)
            }
        }
    }
}
