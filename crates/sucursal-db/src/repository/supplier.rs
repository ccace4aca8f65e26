//! # Supplier Repository
//!
//! Manages suppliers ("proveedores"), keyed by display name. Same
//! LWW-mutable shape as products: `last_modified_ms` is stored here
//! and interpreted by the sync layer.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use sucursal_core::Supplier;

/// Repository for supplier operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Fetches a supplier by name.
    pub async fn get(&self, nombre: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT nombre, telefono, email, last_modified_ms
            FROM proveedores
            WHERE nombre = ?1
            "#,
        )
        .bind(nombre)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Inserts or replaces a supplier by name.
    pub async fn upsert(&self, supplier: &Supplier) -> DbResult<()> {
        debug!(nombre = %supplier.nombre, "Upserting supplier");

        sqlx::query(
            r#"
            INSERT INTO proveedores (nombre, telefono, email, last_modified_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (nombre) DO UPDATE SET
                telefono = excluded.telefono,
                email = excluded.email,
                last_modified_ms = excluded.last_modified_ms
            "#,
        )
        .bind(&supplier.nombre)
        .bind(&supplier.telefono)
        .bind(&supplier.email)
        .bind(supplier.last_modified_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a supplier by name. Returns `false` for an unknown name.
    pub async fn delete(&self, nombre: &str) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM proveedores WHERE nombre = ?1")
            .bind(nombre)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(nombre, deleted = affected > 0, "Deleted supplier");
        Ok(affected > 0)
    }

    /// Lists all suppliers, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT nombre, telefono, email, last_modified_ms
            FROM proveedores
            ORDER BY nombre
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Counts all suppliers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proveedores")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
