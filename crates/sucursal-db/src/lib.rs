//! # sucursal-db: SQLite Layer for Sucursal POS
//!
//! All database access for one branch's local store goes through this
//! crate. It owns the connection pool, the embedded migrations and the
//! repository implementations, including the replication bookkeeping
//! (change log and per-stream cursors).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          sucursal-db                                    │
//! │                                                                         │
//! │  Database (pool.rs)                                                    │
//! │  ├── sales()      → SaleRepository      (ventas + venta_items)         │
//! │  ├── products()   → ProductRepository   (productos)                    │
//! │  ├── suppliers()  → SupplierRepository  (proveedores)                  │
//! │  └── sync_log()   → SyncLogRepository   (sync_log + sync_cursor)       │
//! │                                                                         │
//! │  migrations.rs → embedded SQL from migrations/sqlite                   │
//! │  error.rs      → DbError / DbResult                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shared-Connection Policy
//! Both the interactive app and the sync orchestrator write through the
//! same pool. SQLite WAL mode plus sqlx's per-query connection checkout
//! keeps those writers from tearing each other; there is no module-level
//! connection singleton anywhere.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::sync_log::{NewSyncLogEntry, SyncLogEntry};
