//! # Sale Repository
//!
//! Manages sales ("ventas") and their owned line items.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Write Paths                                 │
//! │                                                                         │
//! │  LOCAL FINALIZE (this branch's register)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_with_items ── single transaction ──► ventas + venta_items      │
//! │                                                                         │
//! │  REMOTE APPLY (sync orchestrator)                                      │
//! │       │                                                                 │
//! │       ├── create: insert_with_items, but a duplicate numero_ticket     │
//! │       │   is a no-op skip (duplicate delivery), never an overwrite     │
//! │       │                                                                 │
//! │       └── update (return): replace_items — delete + reinsert the       │
//! │           item list and fix the total, if the sale exists here         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use sucursal_core::{Sale, SaleItem};

/// Repository for sale operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale and its items in a single transaction.
    ///
    /// Both rows land or neither does; a sale without its items would
    /// replicate as a degenerate record. A duplicate `numero_ticket`
    /// surfaces as [`crate::DbError::UniqueViolation`] for the caller
    /// to interpret (local bug vs. duplicate remote delivery).
    pub async fn insert_with_items(&self, sale: &Sale, items: &[SaleItem]) -> DbResult<()> {
        debug!(
            numero_ticket = sale.numero_ticket,
            item_count = items.len(),
            "Inserting sale"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ventas (numero_ticket, fecha, total_cents, origin_branch)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(sale.numero_ticket)
        .bind(sale.fecha)
        .bind(sale.total_cents)
        .bind(&sale.origin_branch)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO venta_items (id, numero_ticket, codigo_barra, nombre, cantidad, precio_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(sale.numero_ticket)
            .bind(&item.codigo_barra)
            .bind(&item.nombre)
            .bind(item.cantidad)
            .bind(item.precio_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Returns true if a sale with this ticket number exists.
    pub async fn exists(&self, numero_ticket: i64) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ventas WHERE numero_ticket = ?1")
                .bind(numero_ticket)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Fetches a sale header by ticket number.
    pub async fn get(&self, numero_ticket: i64) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT numero_ticket, fecha, total_cents, origin_branch
            FROM ventas
            WHERE numero_ticket = ?1
            "#,
        )
        .bind(numero_ticket)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Fetches the item list for a sale, in insertion order.
    pub async fn items(&self, numero_ticket: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT codigo_barra, nombre, cantidad, precio_cents
            FROM venta_items
            WHERE numero_ticket = ?1
            ORDER BY rowid
            "#,
        )
        .bind(numero_ticket)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Replaces a sale's item list and total (return / "devolución").
    ///
    /// Replace-items-if-present semantics: applied unconditionally when
    /// the ticket exists locally, returns `false` when it does not
    /// (the correction is then harmlessly dropped — a ticket only
    /// "belongs" to its origin branch).
    pub async fn replace_items(
        &self,
        numero_ticket: i64,
        total_cents: i64,
        items: &[SaleItem],
    ) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE ventas SET total_cents = ?2 WHERE numero_ticket = ?1
            "#,
        )
        .bind(numero_ticket)
        .bind(total_cents)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            debug!(numero_ticket, "Sale not present locally, return dropped");
            return Ok(false);
        }

        sqlx::query("DELETE FROM venta_items WHERE numero_ticket = ?1")
            .bind(numero_ticket)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO venta_items (id, numero_ticket, codigo_barra, nombre, cantidad, precio_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(numero_ticket)
            .bind(&item.codigo_barra)
            .bind(&item.nombre)
            .bind(item.cantidad)
            .bind(item.precio_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            numero_ticket,
            item_count = items.len(),
            "Replaced sale items"
        );
        Ok(true)
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ventas")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn sample_sale(ticket: i64) -> (Sale, Vec<SaleItem>) {
        let sale = Sale {
            numero_ticket: ticket,
            fecha: Utc::now(),
            total_cents: 2500,
            origin_branch: "Norte".to_string(),
        };
        let items = vec![
            SaleItem {
                codigo_barra: "7790000000001".to_string(),
                nombre: "Yerba 1kg".to_string(),
                cantidad: 2,
                precio_cents: 1250,
            },
        ];
        (sale, items)
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let (sale, items) = sample_sale(101);
        repo.insert_with_items(&sale, &items).await.unwrap();

        assert!(repo.exists(101).await.unwrap());
        let fetched = repo.get(101).await.unwrap().unwrap();
        assert_eq!(fetched.total_cents, 2500);
        assert_eq!(fetched.origin_branch, "Norte");

        let fetched_items = repo.items(101).await.unwrap();
        assert_eq!(fetched_items, items);
    }

    #[tokio::test]
    async fn test_duplicate_ticket_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let (sale, items) = sample_sale(101);
        repo.insert_with_items(&sale, &items).await.unwrap();

        let err = repo.insert_with_items(&sale, &items).await.unwrap_err();
        assert!(err.is_unique_violation());
        // The failed re-insert must not have touched the stored items.
        assert_eq!(repo.items(101).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let (sale, items) = sample_sale(101);
        repo.insert_with_items(&sale, &items).await.unwrap();

        let corrected = vec![SaleItem {
            codigo_barra: "7790000000001".to_string(),
            nombre: "Yerba 1kg".to_string(),
            cantidad: 1,
            precio_cents: 1250,
        }];
        let found = repo.replace_items(101, 1250, &corrected).await.unwrap();
        assert!(found);

        assert_eq!(repo.items(101).await.unwrap(), corrected);
        assert_eq!(repo.get(101).await.unwrap().unwrap().total_cents, 1250);
    }

    #[tokio::test]
    async fn test_replace_items_missing_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let found = repo.replace_items(999, 0, &[]).await.unwrap();
        assert!(!found);
    }
}
