//! # Product Repository
//!
//! Manages products ("productos"), keyed by barcode.
//!
//! The `last_modified_ms` column drives last-write-wins conflict
//! resolution: the sync orchestrator reads the current value before
//! deciding whether an incoming upsert applies. This repository only
//! stores; the policy lives in sucursal-sync.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use sucursal_core::Product;

/// Repository for product operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Fetches a product by barcode.
    pub async fn get(&self, codigo_barra: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT codigo_barra, nombre, precio_cents, categoria, last_modified_ms
            FROM productos
            WHERE codigo_barra = ?1
            "#,
        )
        .bind(codigo_barra)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts or replaces a product by barcode.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        debug!(codigo_barra = %product.codigo_barra, "Upserting product");

        sqlx::query(
            r#"
            INSERT INTO productos (codigo_barra, nombre, precio_cents, categoria, last_modified_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (codigo_barra) DO UPDATE SET
                nombre = excluded.nombre,
                precio_cents = excluded.precio_cents,
                categoria = excluded.categoria,
                last_modified_ms = excluded.last_modified_ms
            "#,
        )
        .bind(&product.codigo_barra)
        .bind(&product.nombre)
        .bind(product.precio_cents)
        .bind(&product.categoria)
        .bind(product.last_modified_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a product by barcode.
    ///
    /// ## Returns
    /// `true` if a row was removed, `false` if the barcode was unknown
    /// (a tombstone for an already-absent product is a no-op).
    pub async fn delete(&self, codigo_barra: &str) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM productos WHERE codigo_barra = ?1")
            .bind(codigo_barra)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(codigo_barra, deleted = affected > 0, "Deleted product");
        Ok(affected > 0)
    }

    /// Lists all products, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT codigo_barra, nombre, precio_cents, categoria, last_modified_ms
            FROM productos
            ORDER BY nombre
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM productos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
