//! # Change Records
//!
//! The atomic, immutable unit of replicated state change.
//!
//! ## Replication Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Change Record Lifecycle                           │
//! │                                                                         │
//! │  BRANCH "Norte"                              BRANCH "Sur"              │
//! │  ──────────────                              ────────────              │
//! │  local mutation                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ChangePackager ──► ChangeRecord ──► append log ──► read_from(cursor)  │
//! │                     (immutable,      (assigns the        │             │
//! │                      no local ids)    sync_id/push key)  ▼             │
//! │                                                     apply + sync_log   │
//! │                                                                         │
//! │  STREAMS (independent cursors, no cross-entity ordering)              │
//! │  ──────────────────────────────────────────────────────                │
//! │  Sales:     sale, sale_update                                          │
//! │  Products:  product, product_delete                                    │
//! │  Suppliers: supplier, supplier_delete                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format (JSON)
//! Records serialize flat, with the payload internally tagged by
//! `entity_type`:
//! ```json
//! {
//!   "action": "upsert",
//!   "origin_branch": "Norte",
//!   "timestamp_ms": 1723456789000,
//!   "entity_type": "product",
//!   "codigo_barra": "7790000000001",
//!   "nombre": "Yerba 1kg",
//!   "precio_cents": 1250,
//!   "categoria": null,
//!   "last_modified_ms": 1723456789000
//! }
//! ```
//!
//! The `sync_id` is NOT part of the record body: it is the append-log
//! key (Firebase push key or equivalent), delivered alongside the record
//! and used as cursor position and idempotency key.
//!
//! Payload schemas are strict: a record missing a required field is
//! rejected at deserialization, never patched up at point of use.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{Product, Sale, SaleItem, Supplier};

// =============================================================================
// Change Action
// =============================================================================

/// The kind of mutation a change record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// New entity (sale finalized).
    Create,
    /// Post-hoc correction (sale return).
    Update,
    /// Insert-or-replace (product/supplier saved).
    Upsert,
    /// Tombstone: the entity was removed at the origin branch.
    Delete,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Create => write!(f, "create"),
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Upsert => write!(f, "upsert"),
            ChangeAction::Delete => write!(f, "delete"),
        }
    }
}

// =============================================================================
// Entity Streams
// =============================================================================

/// The three independent replication streams.
///
/// Each stream has its own append-log collection and its own local
/// cursor, so a backlog in one entity type never blocks another. There
/// is no ordering guarantee across streams and none is needed: the
/// payloads carry no cross-entity foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStream {
    /// Sale creates and returns.
    Sales,
    /// Product upserts and tombstones.
    Products,
    /// Supplier upserts and tombstones.
    Suppliers,
}

impl EntityStream {
    /// All streams, in pull order.
    pub const ALL: [EntityStream; 3] = [
        EntityStream::Sales,
        EntityStream::Products,
        EntityStream::Suppliers,
    ];

    /// Stable short name, used as cursor key in local storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityStream::Sales => "ventas",
            EntityStream::Products => "productos",
            EntityStream::Suppliers => "proveedores",
        }
    }

    /// Remote append-log collection path for this stream.
    pub const fn collection(&self) -> &'static str {
        match self {
            EntityStream::Sales => "cambios/ventas",
            EntityStream::Products => "cambios/productos",
            EntityStream::Suppliers => "cambios/proveedores",
        }
    }
}

impl std::fmt::Display for EntityStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ventas" => Ok(EntityStream::Sales),
            "productos" => Ok(EntityStream::Products),
            "proveedores" => Ok(EntityStream::Suppliers),
            other => Err(format!("unknown entity stream: '{}'", other)),
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Entity-specific payload, internally tagged by `entity_type`.
///
/// Only the fields a remote consumer needs to reconstruct or merge the
/// entity are carried; local surrogate keys never cross the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum ChangePayload {
    /// A finalized sale with its denormalized item list.
    Sale(SalePayload),
    /// A post-hoc item correction (return) for an existing sale.
    SaleUpdate(SaleReturnPayload),
    /// Full product state for upsert.
    Product(Product),
    /// Product tombstone.
    ProductDelete(ProductDeletePayload),
    /// Full supplier state for upsert.
    Supplier(Supplier),
    /// Supplier tombstone.
    SupplierDelete(SupplierDeletePayload),
}

/// Sale payload: header plus denormalized items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalePayload {
    pub numero_ticket: i64,
    pub fecha: chrono::DateTime<Utc>,
    pub total_cents: i64,
    /// Snapshot line items (barcode/name/qty/price), not foreign keys.
    pub items: Vec<SaleItem>,
}

impl SalePayload {
    /// Builds the payload from a sale and its item list.
    pub fn from_sale(sale: &Sale, items: &[SaleItem]) -> Self {
        SalePayload {
            numero_ticket: sale.numero_ticket,
            fecha: sale.fecha,
            total_cents: sale.total_cents,
            items: items.to_vec(),
        }
    }
}

/// Sale return payload: the replacement item list for a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleReturnPayload {
    pub numero_ticket: i64,
    /// New total after the correction.
    pub total_cents: i64,
    /// Full replacement item list (replace-items-if-present semantics).
    pub items: Vec<SaleItem>,
}

/// Product tombstone payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDeletePayload {
    pub codigo_barra: String,
}

/// Supplier tombstone payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierDeletePayload {
    pub nombre: String,
}

impl ChangePayload {
    /// The stream this payload replicates on.
    pub const fn stream(&self) -> EntityStream {
        match self {
            ChangePayload::Sale(_) | ChangePayload::SaleUpdate(_) => EntityStream::Sales,
            ChangePayload::Product(_) | ChangePayload::ProductDelete(_) => EntityStream::Products,
            ChangePayload::Supplier(_) | ChangePayload::SupplierDelete(_) => {
                EntityStream::Suppliers
            }
        }
    }

    /// The entity type tag as it appears on the wire (for logging).
    pub const fn entity_type(&self) -> &'static str {
        match self {
            ChangePayload::Sale(_) => "sale",
            ChangePayload::SaleUpdate(_) => "sale_update",
            ChangePayload::Product(_) => "product",
            ChangePayload::ProductDelete(_) => "product_delete",
            ChangePayload::Supplier(_) => "supplier",
            ChangePayload::SupplierDelete(_) => "supplier_delete",
        }
    }

    /// The natural key of the affected entity (for logging).
    pub fn natural_key(&self) -> String {
        match self {
            ChangePayload::Sale(p) => p.numero_ticket.to_string(),
            ChangePayload::SaleUpdate(p) => p.numero_ticket.to_string(),
            ChangePayload::Product(p) => p.codigo_barra.clone(),
            ChangePayload::ProductDelete(p) => p.codigo_barra.clone(),
            ChangePayload::Supplier(s) => s.nombre.clone(),
            ChangePayload::SupplierDelete(p) => p.nombre.clone(),
        }
    }
}

// =============================================================================
// Change Record
// =============================================================================

/// The unit of replication.
///
/// Immutable once published; consumers never mutate a record, only
/// record it as applied in their change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The mutation kind, derived from the call site.
    pub action: ChangeAction,

    /// Branch that produced this change.
    pub origin_branch: String,

    /// Producer-local epoch milliseconds. Used for last-write-wins
    /// conflict ordering only; NOT a causality guarantee (branch clocks
    /// are not synchronized).
    pub timestamp_ms: i64,

    /// Entity-specific field set, flattened onto the record.
    #[serde(flatten)]
    pub payload: ChangePayload,
}

impl ChangeRecord {
    /// Creates a record stamped with the current producer-local time.
    pub fn new(action: ChangeAction, origin_branch: &str, payload: ChangePayload) -> Self {
        ChangeRecord {
            action,
            origin_branch: origin_branch.to_string(),
            timestamp_ms: Utc::now().timestamp_millis(),
            payload,
        }
    }

    /// The stream this record replicates on.
    #[inline]
    pub const fn stream(&self) -> EntityStream {
        self.payload.stream()
    }

    /// Stable hex digest of the serialized record, stored in the change
    /// log for operator forensics (detecting re-published records with
    /// diverging content). Informational only; not part of the protocol.
    pub fn content_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        json.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON, rejecting malformed payloads.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            codigo_barra: "7790000000001".to_string(),
            nombre: "Yerba 1kg".to_string(),
            precio_cents: 1250,
            categoria: Some("Almacen".to_string()),
            last_modified_ms: 1_723_456_789_000,
        }
    }

    #[test]
    fn test_record_serialization_is_flat_and_tagged() {
        let record = ChangeRecord::new(
            ChangeAction::Upsert,
            "Norte",
            ChangePayload::Product(sample_product()),
        );

        let json = record.to_json().unwrap();
        assert!(json.contains("\"entity_type\":\"product\""));
        assert!(json.contains("\"action\":\"upsert\""));
        assert!(json.contains("\"origin_branch\":\"Norte\""));
        assert!(json.contains("\"codigo_barra\":\"7790000000001\""));

        let parsed = ChangeRecord::from_json(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.stream(), EntityStream::Products);
    }

    #[test]
    fn test_sale_payload_round_trip() {
        let sale = Sale {
            numero_ticket: 101,
            fecha: Utc::now(),
            total_cents: 5000,
            origin_branch: "Norte".to_string(),
        };
        let items = vec![SaleItem {
            codigo_barra: "7790000000001".to_string(),
            nombre: "Yerba 1kg".to_string(),
            cantidad: 4,
            precio_cents: 1250,
        }];

        let record = ChangeRecord::new(
            ChangeAction::Create,
            "Norte",
            ChangePayload::Sale(SalePayload::from_sale(&sale, &items)),
        );

        let parsed = ChangeRecord::from_json(&record.to_json().unwrap()).unwrap();
        match parsed.payload {
            ChangePayload::Sale(p) => {
                assert_eq!(p.numero_ticket, 101);
                assert_eq!(p.items.len(), 1);
                assert_eq!(p.items[0].cantidad, 4);
            }
            other => panic!("expected Sale payload, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payload_rejected() {
        // Missing `nombre` on a product payload: strict schema refuses it.
        let json = r#"{
            "action": "upsert",
            "origin_branch": "Norte",
            "timestamp_ms": 1,
            "entity_type": "product",
            "codigo_barra": "779",
            "precio_cents": 100
        }"#;
        assert!(ChangeRecord::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let json = r#"{
            "action": "create",
            "origin_branch": "Norte",
            "timestamp_ms": 1,
            "entity_type": "payment"
        }"#;
        assert!(ChangeRecord::from_json(json).is_err());
    }

    #[test]
    fn test_content_hash_stable() {
        let record = ChangeRecord {
            action: ChangeAction::Upsert,
            origin_branch: "Sur".to_string(),
            timestamp_ms: 42,
            payload: ChangePayload::Product(sample_product()),
        };
        assert_eq!(record.content_hash(), record.content_hash());

        let mut other = record.clone();
        other.timestamp_ms = 43;
        assert_ne!(record.content_hash(), other.content_hash());
    }

    #[test]
    fn test_stream_names_round_trip() {
        for stream in EntityStream::ALL {
            let parsed: EntityStream = stream.as_str().parse().unwrap();
            assert_eq!(parsed, stream);
        }
        assert!("payments".parse::<EntityStream>().is_err());
    }
}
