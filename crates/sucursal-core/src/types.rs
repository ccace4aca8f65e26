//! # Domain Types
//!
//! Core domain entities shared by every branch.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Product      │   │    Supplier     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  numero_ticket  │   │  codigo_barra   │   │  nombre         │       │
//! │  │  (natural key)  │   │  (natural key)  │   │  (natural key)  │       │
//! │  │  total_cents    │   │  precio_cents   │   │  telefono       │       │
//! │  │  origin_branch  │   │  last_modified  │   │  last_modified  │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │ owns (cascade delete)                                      │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    SaleItem     │  Denormalized product snapshot:                   │
//! │  │  codigo_barra   │  barcode/name/price frozen at sale time so a      │
//! │  │  nombre         │  remote branch can reconstruct the sale without   │
//! │  │  cantidad       │  sharing surrogate keys                           │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Natural-Key Identity
//! Replication deliberately uses business keys, not surrogate ids:
//! - Sale: `numero_ticket` (globally unique via branch parity)
//! - Product: `codigo_barra` (barcode)
//! - Supplier: `nombre`
//!
//! Each branch's local store has its own row ids; those never cross the
//! wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Ticket Parity
// =============================================================================

/// Ticket-number partition assigned to a branch.
///
/// ## Why Parity?
/// Two branches mint ticket numbers concurrently with no coordinator.
/// Giving one branch the odd numbers and the other the even numbers
/// makes `numero_ticket` globally unique without any handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketParity {
    /// This branch assigns odd ticket numbers (1, 3, 5, ...).
    Odd,
    /// This branch assigns even ticket numbers (2, 4, 6, ...).
    Even,
}

impl TicketParity {
    /// Returns true if the given ticket number belongs to this partition.
    #[inline]
    pub const fn matches(&self, ticket: i64) -> bool {
        match self {
            TicketParity::Odd => ticket % 2 != 0,
            TicketParity::Even => ticket % 2 == 0,
        }
    }

    /// Returns the next ticket number after `last` in this partition.
    ///
    /// ## Example
    /// ```rust
    /// use sucursal_core::types::TicketParity;
    ///
    /// assert_eq!(TicketParity::Odd.next_ticket(0), 1);
    /// assert_eq!(TicketParity::Odd.next_ticket(5), 7);
    /// assert_eq!(TicketParity::Even.next_ticket(0), 2);
    /// assert_eq!(TicketParity::Even.next_ticket(5), 6);
    /// ```
    pub const fn next_ticket(&self, last: i64) -> i64 {
        let candidate = last + 1;
        if self.matches(candidate) {
            candidate
        } else {
            candidate + 1
        }
    }
}

impl std::fmt::Display for TicketParity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketParity::Odd => write!(f, "odd"),
            TicketParity::Even => write!(f, "even"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale ("venta").
///
/// Sales are append-mostly: once created they are never rewritten by a
/// remote copy. The only update is a post-hoc item correction
/// (return / "devolución") replacing the item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Ticket number - the global natural key (parity-partitioned).
    pub numero_ticket: i64,

    /// When the sale was finalized at its origin branch.
    pub fecha: DateTime<Utc>,

    /// Total in cents (smallest currency unit, never floats).
    pub total_cents: i64,

    /// Branch that produced this sale. A ticket "belongs" to its
    /// origin branch; other branches hold read-only replicas.
    pub origin_branch: String,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: barcode, name and price are frozen at
/// sale time so the record is self-contained on the wire. Remote
/// branches reconstruct the sale from these fields alone; local
/// surrogate keys never replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    /// Product barcode at time of sale (frozen).
    pub codigo_barra: String,

    /// Product name at time of sale (frozen).
    pub nombre: String,

    /// Quantity sold.
    pub cantidad: i64,

    /// Unit price in cents at time of sale (frozen).
    pub precio_cents: i64,
}

impl SaleItem {
    /// Line total in cents (unit price × quantity).
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.precio_cents * self.cantidad
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product ("producto"), identified by barcode across all branches.
///
/// Mutable; concurrent edits from two branches are resolved
/// last-write-wins by `last_modified_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Barcode - the global natural key.
    pub codigo_barra: String,

    /// Display name.
    pub nombre: String,

    /// Price in cents.
    pub precio_cents: i64,

    /// Optional category label.
    pub categoria: Option<String>,

    /// Producer-local mutation timestamp, epoch milliseconds.
    ///
    /// Used only for last-write-wins ordering. Clocks are NOT
    /// synchronized across branches; this is an opaque sortable value,
    /// not a causality guarantee.
    pub last_modified_ms: i64,
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier ("proveedor"), identified by name across all branches.
///
/// Same last-write-wins discipline as [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    /// Supplier name - the global natural key.
    pub nombre: String,

    /// Contact phone.
    pub telefono: Option<String>,

    /// Contact email.
    pub email: Option<String>,

    /// Producer-local mutation timestamp, epoch milliseconds.
    pub last_modified_ms: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
