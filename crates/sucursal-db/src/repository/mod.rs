//! # Repository Implementations
//!
//! One repository per aggregate, all backed by the shared pool:
//!
//! - [`sale`] - ventas + venta_items (append-mostly, cascade delete)
//! - [`product`] - productos (LWW-mutable by barcode)
//! - [`supplier`] - proveedores (LWW-mutable by name)
//! - [`sync_log`] - change log + per-stream cursors

pub mod product;
pub mod sale;
pub mod supplier;
pub mod sync_log;
