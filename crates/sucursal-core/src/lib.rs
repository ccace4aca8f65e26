//! # sucursal-core: Pure Domain Types for Sucursal POS
//!
//! This crate is the shared vocabulary of every branch ("sucursal").
//! It contains the domain entities, the replication payload schema and
//! the validation rules, all as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sucursal POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    sucursal-sync (engine)                       │   │
//! │  │     Packager ──► AppendLog transport ──► Orchestrator           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sucursal-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  record   │  │ validation│  │   error   │  │   │
//! │  │   │  Product  │  │ Change-   │  │   rules   │  │  domain   │  │   │
//! │  │   │   Sale    │  │  Record   │  │  checks   │  │  errors   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  sucursal-db (Database Layer)                   │   │
//! │  │             SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Sale, SaleItem, Product, Supplier)
//! - [`record`] - The replication unit: [`record::ChangeRecord`]
//! - [`validation`] - Natural-key and payload validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are cents (i64), never floats
//! 4. **Strict Payloads**: malformed change records are rejected at the
//!    deserialization boundary, never probed for alternate field names

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod record;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use sucursal_core::ChangeRecord` instead of
// `use sucursal_core::record::ChangeRecord`

pub use error::{CoreError, ValidationError};
pub use record::{
    ChangeAction, ChangePayload, ChangeRecord, EntityStream, ProductDeletePayload, SalePayload,
    SaleReturnPayload, SupplierDeletePayload,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a barcode (`codigo_barra`).
///
/// ## Business Reason
/// EAN-13 and UPC-A fit comfortably; the cap guards against scanner
/// glitches writing garbage keys that would replicate to every branch.
pub const MAX_BARCODE_LEN: usize = 32;

/// Maximum length of product and supplier names.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum number of line items in a single sale.
///
/// ## Business Reason
/// Bounds the size of one change record on the wire. A retail ticket
/// with more lines than this is almost certainly an input error.
pub const MAX_SALE_ITEMS: usize = 200;
