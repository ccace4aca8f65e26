//! # Conflict Resolution
//!
//! Last-write-wins policy for the mutable entities (products and
//! suppliers). Pure decision logic; the orchestrator gathers the
//! timestamps and acts on the verdict.
//!
//! Timestamps are producer-local epoch milliseconds. Branch clocks are
//! not synchronized, so this is deliberate approximate convergence:
//! both branches end up with the same winner because both compare the
//! same two numbers, even if "later" does not strictly mean "newer" in
//! wall-clock terms.

use tracing::debug;

/// Verdict for an incoming upsert against local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Incoming record wins; overwrite local state.
    Apply,
    /// Local state is newer; drop the incoming record.
    KeepLocal,
}

/// Resolves an incoming upsert against the local copy.
///
/// `local_ts` is `None` when the entity does not exist locally (an
/// insert always applies). Ties go to the incoming record: applying is
/// idempotent for identical content, and for genuinely different
/// same-millisecond edits both branches pick the same winner only via
/// the log order, which this tie-break preserves.
pub fn resolve_upsert(local_ts: Option<i64>, incoming_ts: i64) -> Resolution {
    match local_ts {
        Some(local) if local > incoming_ts => {
            debug!(local, incoming_ts, "Local copy newer, keeping it");
            Resolution::KeepLocal
        }
        _ => Resolution::Apply,
    }
}
