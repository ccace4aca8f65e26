//! # sucursal-sync: Replication Engine for Sucursal POS
//!
//! Keeps two (or more) branch stores convergent through a shared
//! append-only change log, with full offline tolerance.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          sucursal-sync                                  │
//! │                                                                         │
//! │  local mutation                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ChangePackager (packager.rs) ── validation, branch stamp              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncOrchestrator (orchestrator.rs)                                    │
//! │       │                                    ┌────────────────────┐      │
//! │       ├── append ────────────────────────► │ AppendLog          │      │
//! │       │        │ (offline)                 │ (transport.rs)     │      │
//! │       │        ▼                           │  FirebaseLog: REST │      │
//! │       │   OfflineQueue (queue.rs)          │  MemoryLog: tests  │      │
//! │       │                                    └────────────────────┘      │
//! │       ├── pull per stream ◄── cursors (sucursal-db sync_cursor)        │
//! │       └── apply ── LWW resolver (resolver.rs) ── sucursal-db           │
//! │                                                                         │
//! │  SyncConfig (config.rs) ── TOML, per-branch identity + remote creds    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - **Idempotent apply**: every record's log key lands in `sync_log`
//!   before it can be considered again; redelivery is a no-op.
//! - **Offline-first**: a dead network queues pushes and skips pulls;
//!   it never surfaces as an error to the interactive layer.
//! - **Convergence**: sales are append-only with globally unique
//!   tickets (parity partitioning); products and suppliers converge
//!   last-write-wins on producer timestamps.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod packager;
pub mod queue;
pub mod resolver;
pub mod transport;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use orchestrator::{CycleSummary, SyncOrchestrator};
pub use packager::ChangePackager;
pub use queue::{OfflineQueue, QueuedChange};
pub use resolver::{resolve_upsert, Resolution};
pub use transport::{AppendLog, FirebaseLog, LogHealth, MemoryLog};
