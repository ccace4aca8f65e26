//! # Error Types
//!
//! Domain-specific error types for sucursal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sucursal-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Natural-key / payload validation failures      │
//! │                                                                         │
//! │  sucursal-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  sucursal-sync errors (separate crate)                                 │
//! │  └── SyncError        - Config, queue and apply failures               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → cycle summary         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (barcode, ticket number, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These errors represent business rule violations or domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found by its barcode.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Supplier cannot be found by its name.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    /// Sale cannot be found by its ticket number.
    #[error("Sale not found: ticket {0}")]
    SaleNotFound(i64),

    /// A ticket number was minted with the wrong parity for this branch.
    ///
    /// ## When This Occurs
    /// Ticket numbers are partitioned by branch parity (odd/even) so two
    /// branches never assign the same `numero_ticket` without
    /// coordination. A mismatch means the branch configuration and the
    /// local counter disagree.
    #[error("Ticket {ticket} does not match this branch's {expected:?} parity")]
    TicketParityMismatch {
        ticket: i64,
        expected: crate::types::TicketParity,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used by the change packager to refuse degenerate records before they
/// can replicate to other branches.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Collection has too many elements.
    #[error("{field} must have at most {max} entries")]
    TooMany { field: String, max: usize },

    /// Collection must not be empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Invalid format (e.g., non-numeric barcode characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SaleNotFound(101);
        assert_eq!(err.to_string(), "Sale not found: ticket 101");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "codigo_barra".to_string(),
        };
        assert_eq!(err.to_string(), "codigo_barra is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
