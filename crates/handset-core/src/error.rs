//! # Error Types
//!
//! Domain-specific error types for handset-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  handset-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  handset-db errors                                                     │
//! │  └── DbError          - SQLite operation failures                      │
//! │                                                                         │
//! │  handset-engine errors                                                 │
//! │  ├── StoreError       - Record store contract failures                 │
//! │  └── EngineError      - What the presentation layer sees               │
//! │                                                                         │
//! │  Sub-write failures are NOT errors: they are report entries.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist or was soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Explicitly referenced units cannot satisfy an allocation.
    ///
    /// ## When This Occurs
    /// - Every IMEI on a sale line belongs to another product
    /// - Every referenced unit was already sold
    #[error("Allocation mismatch for product {product_id}: {reason}")]
    AllocationMismatch { product_id: String, reason: String },

    /// A line references a product that is not IMEI-tracked with IMEIs.
    #[error("Product {product_id} is not IMEI-tracked")]
    NotTracked { product_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write is attempted; always user-correctable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (IMEI, amount, UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., an IMEI already registered).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Customer balance does not cover the store credit being applied.
    #[error("Insufficient store credit: available {available}, requested {requested}")]
    InsufficientCredit { available: String, requested: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ValidationError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
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
        let err = CoreError::AllocationMismatch {
            product_id: "p-1".to_string(),
            reason: "no referenced unit is in stock".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Allocation mismatch for product p-1: no referenced unit is in stock"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("imei").to_string(), "imei is required");

        let err = ValidationError::duplicate("imei", "356938035643809");
        assert_eq!(err.to_string(), "imei '356938035643809' already exists");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
