//! # Change Packager
//!
//! Builds publishable [`ChangeRecord`]s from local mutations.
//!
//! One packager per branch, stamped with the branch name and the
//! branch's ticket parity. Validation happens HERE, before a record
//! exists: a change that fails validation is refused outright and
//! never reaches the log or the offline queue. Remote stores only ever
//! see well-formed records.

use tracing::debug;

use crate::error::SyncResult;
use sucursal_core::validation::{
    validate_barcode, validate_branch, validate_name, validate_sale_items, validate_ticket_parity,
};
use sucursal_core::{
    ChangeAction, ChangePayload, ChangeRecord, Product, ProductDeletePayload, Sale, SaleItem,
    SalePayload, SaleReturnPayload, Supplier, SupplierDeletePayload, TicketParity,
};

/// Builds change records for one branch's mutations.
#[derive(Debug, Clone)]
pub struct ChangePackager {
    branch: String,
    parity: TicketParity,
}

impl ChangePackager {
    /// Creates a packager for the given branch identity.
    pub fn new(branch: &str, parity: TicketParity) -> SyncResult<Self> {
        validate_branch(branch)?;
        Ok(ChangePackager {
            branch: branch.to_string(),
            parity,
        })
    }

    /// The branch name stamped into every record.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Packages a finalized sale.
    ///
    /// Refuses tickets outside this branch's parity partition: a
    /// wrong-parity ticket replicating would collide with the other
    /// branch's number space.
    pub fn sale_created(&self, sale: &Sale, items: &[SaleItem]) -> SyncResult<ChangeRecord> {
        validate_ticket_parity(sale.numero_ticket, self.parity)?;
        validate_sale_items(items)?;

        let record = ChangeRecord::new(
            ChangeAction::Create,
            &self.branch,
            ChangePayload::Sale(SalePayload::from_sale(sale, items)),
        );
        debug!(numero_ticket = sale.numero_ticket, "Packaged sale");
        Ok(record)
    }

    /// Packages a sale return (item correction).
    pub fn sale_returned(
        &self,
        numero_ticket: i64,
        total_cents: i64,
        items: &[SaleItem],
    ) -> SyncResult<ChangeRecord> {
        validate_ticket_parity(numero_ticket, self.parity)?;
        validate_sale_items(items)?;

        let record = ChangeRecord::new(
            ChangeAction::Update,
            &self.branch,
            ChangePayload::SaleUpdate(SaleReturnPayload {
                numero_ticket,
                total_cents,
                items: items.to_vec(),
            }),
        );
        debug!(numero_ticket, "Packaged sale return");
        Ok(record)
    }

    /// Packages a product save (create or edit).
    pub fn product_saved(&self, product: &Product) -> SyncResult<ChangeRecord> {
        validate_barcode(&product.codigo_barra)?;
        validate_name("nombre", &product.nombre)?;

        let record = ChangeRecord::new(
            ChangeAction::Upsert,
            &self.branch,
            ChangePayload::Product(product.clone()),
        );
        debug!(codigo_barra = %product.codigo_barra, "Packaged product");
        Ok(record)
    }

    /// Packages a product deletion (tombstone).
    pub fn product_deleted(&self, codigo_barra: &str) -> SyncResult<ChangeRecord> {
        validate_barcode(codigo_barra)?;

        let record = ChangeRecord::new(
            ChangeAction::Delete,
            &self.branch,
            ChangePayload::ProductDelete(ProductDeletePayload {
                codigo_barra: codigo_barra.to_string(),
            }),
        );
        debug!(codigo_barra, "Packaged product tombstone");
        Ok(record)
    }

    /// Packages a supplier save (create or edit).
    pub fn supplier_saved(&self, supplier: &Supplier) -> SyncResult<ChangeRecord> {
        validate_name("nombre", &supplier.nombre)?;

        let record = ChangeRecord::new(
            ChangeAction::Upsert,
            &self.branch,
            ChangePayload::Supplier(supplier.clone()),
        );
        debug!(nombre = %supplier.nombre, "Packaged supplier");
        Ok(record)
    }

    /// Packages a supplier deletion (tombstone).
    pub fn supplier_deleted(&self, nombre: &str) -> SyncResult<ChangeRecord> {
        validate_name("nombre", nombre)?;

        let record = ChangeRecord::new(
            ChangeAction::Delete,
            &self.branch,
            ChangePayload::SupplierDelete(SupplierDeletePayload {
                nombre: nombre.to_string(),
            }),
        );
        debug!(nombre, "Packaged supplier tombstone");
        Ok(record)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sucursal_core::EntityStream;

    fn packager() -> ChangePackager {
        ChangePackager::new("Norte", TicketParity::Odd).unwrap()
    }

    fn sale(ticket: i64) -> (Sale, Vec<SaleItem>) {
        (
            Sale {
                numero_ticket: ticket,
                fecha: Utc::now(),
                total_cents: 1250,
                origin_branch: "Norte".to_string(),
            },
            vec![SaleItem {
                codigo_barra: "7790000000001".to_string(),
                nombre: "Yerba 1kg".to_string(),
                cantidad: 1,
                precio_cents: 1250,
            }],
        )
    }

    #[test]
    fn test_sale_record_carries_branch_and_stream() {
        let (sale, items) = sale(101);
        let record = packager().sale_created(&sale, &items).unwrap();

        assert_eq!(record.origin_branch, "Norte");
        assert_eq!(record.action, ChangeAction::Create);
        assert_eq!(record.stream(), EntityStream::Sales);
    }

    #[test]
    fn test_wrong_parity_ticket_refused() {
        let (sale, items) = sale(102); // even, but branch is odd
        assert!(packager().sale_created(&sale, &items).is_err());
    }

    #[test]
    fn test_empty_items_refused() {
        let (sale, _) = sale(101);
        assert!(packager().sale_created(&sale, &[]).is_err());
    }

    #[test]
    fn test_tombstone_requires_valid_key() {
        let p = packager();
        assert!(p.product_deleted("7790000000001").is_ok());
        assert!(p.product_deleted("").is_err());
        assert!(p.supplier_deleted("Distribuidora Centro").is_ok());
        assert!(p.supplier_deleted("   ").is_err());
    }

    #[test]
    fn test_empty_branch_refused() {
        assert!(ChangePackager::new("", TicketParity::Odd).is_err());
    }
}
