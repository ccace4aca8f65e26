//! # Validation Module
//!
//! Natural-key and payload validation for replication.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Change Packager (Rust)                                       │
//! │  ├── THIS MODULE: natural-key checks before a record is built          │
//! │  └── A degenerate record (empty barcode) must never replicate          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Deserialization boundary (serde)                             │
//! │  └── Strict payload schema; missing fields are rejected                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (numero_ticket, codigo_barra, nombre)          │
//! │  └── Foreign key constraints (cascade delete of sale items)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sucursal_core::validation::{validate_barcode, validate_ticket};
//!
//! validate_barcode("7790000000001").unwrap();
//! validate_ticket(101).unwrap();
//! assert!(validate_barcode("").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{SaleItem, TicketParity};
use crate::{MAX_BARCODE_LEN, MAX_NAME_LEN, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Key Validators
// =============================================================================

/// Validates a product barcode (`codigo_barra`).
///
/// ## Rules
/// - Must not be empty (a record without its natural key would corrupt
///   remote stores)
/// - At most [`MAX_BARCODE_LEN`] characters
/// - Alphanumeric plus hyphens (covers EAN/UPC and internal codes)
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "codigo_barra".to_string(),
        });
    }

    if barcode.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "codigo_barra".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !barcode.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "codigo_barra".to_string(),
            reason: "must contain only letters, numbers and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product `nombre`, supplier `nombre`).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a ticket number.
pub fn validate_ticket(numero_ticket: i64) -> ValidationResult<()> {
    if numero_ticket <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "numero_ticket".to_string(),
        });
    }
    Ok(())
}

/// Validates a ticket number against this branch's parity partition.
pub fn validate_ticket_parity(numero_ticket: i64, parity: TicketParity) -> ValidationResult<()> {
    validate_ticket(numero_ticket)?;

    if !parity.matches(numero_ticket) {
        return Err(ValidationError::InvalidFormat {
            field: "numero_ticket".to_string(),
            reason: format!("ticket {} is not {} for this branch", numero_ticket, parity),
        });
    }

    Ok(())
}

/// Validates a branch name.
pub fn validate_branch(branch: &str) -> ValidationResult<()> {
    validate_name("branch", branch)
}

// =============================================================================
// Item Validators
// =============================================================================

/// Validates the item list of a sale payload.
///
/// ## Rules
/// - Must not be empty (a sale without items is a degenerate record)
/// - At most [`MAX_SALE_ITEMS`] lines
/// - Every item carries a valid barcode, a name and a positive quantity
pub fn validate_sale_items(items: &[SaleItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_SALE_ITEMS,
        });
    }

    for item in items {
        validate_barcode(&item.codigo_barra)?;
        validate_name("nombre", &item.nombre)?;
        if item.cantidad <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "cantidad".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(barcode: &str, qty: i64) -> SaleItem {
        SaleItem {
            codigo_barra: barcode.to_string(),
            nombre: "Test".to_string(),
            cantidad: qty,
            precio_cents: 100,
        }
    }

    #[test]
    fn test_barcode_rules() {
        assert!(validate_barcode("7790000000001").is_ok());
        assert!(validate_barcode("ABC-123").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode("has spaces").is_err());
        assert!(validate_barcode(&"9".repeat(MAX_BARCODE_LEN + 1)).is_err());
    }

    #[test]
    fn test_ticket_rules() {
        assert!(validate_ticket(1).is_ok());
        assert!(validate_ticket(0).is_err());
        assert!(validate_ticket(-5).is_err());

        assert!(validate_ticket_parity(101, TicketParity::Odd).is_ok());
        assert!(validate_ticket_parity(102, TicketParity::Odd).is_err());
        assert!(validate_ticket_parity(102, TicketParity::Even).is_ok());
    }

    #[test]
    fn test_sale_items_rules() {
        assert!(validate_sale_items(&[item("779", 1)]).is_ok());
        assert!(validate_sale_items(&[]).is_err());
        assert!(validate_sale_items(&[item("", 1)]).is_err());
        assert!(validate_sale_items(&[item("779", 0)]).is_err());
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("nombre", "Proveedor SA").is_ok());
        assert!(validate_name("nombre", "").is_err());
        assert!(validate_name("nombre", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
