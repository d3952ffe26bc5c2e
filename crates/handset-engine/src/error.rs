//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Rejected      │  │   Store         │  │   Configuration         │ │
//! │  │ (before writes) │  │                 │  │                         │ │
//! │  │  Validation     │  │  StoreError     │  │  Config                 │ │
//! │  │  NotFound       │  │  (top-level     │  │                         │ │
//! │  │  AllocationMis. │  │   write failed) │  │                         │ │
//! │  │  NotTracked     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  A failed SUB-write is not an error: it is a StepStatus::Failed entry  │
//! │  in the OperationReport and never aborts its siblings.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use handset_core::{CoreError, ValidationError};
use handset_db::DbError;
use thiserror::Error;

/// Result of a single record store call.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Store Errors
// =============================================================================

/// Failure reported by a [`RecordStore`](crate::store::RecordStore)
/// implementation, whatever its backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record missing or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique constraint rejected the write (live IMEI already present).
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A stored value violates a constraint.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The backend could not be reached or is exhausted.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("Store operation failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => StoreError::Duplicate { field, value },
            DbError::ForeignKeyViolation { message } | DbError::CheckViolation { message } => {
                StoreError::Constraint(message)
            }
            DbError::ConnectionFailed(msg) => StoreError::Unavailable(msg),
            DbError::PoolExhausted => StoreError::Unavailable("connection pool exhausted".into()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors that abort an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced record is missing or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// None of the explicitly named units can be sold for this product.
    #[error("Allocation mismatch for product {product_id}: {reason}")]
    AllocationMismatch { product_id: String, reason: String },

    /// The operation needs an IMEI-tracked product.
    #[error("Product {product_id} is not IMEI-tracked")]
    NotTracked { product_id: String },

    /// A top-level store call failed (reads during planning, the parent
    /// record write).
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            StoreError::Duplicate { field, value } => {
                EngineError::Validation(ValidationError::duplicate(field, value))
            }
            other => EngineError::Store(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            CoreError::AllocationMismatch { product_id, reason } => {
                EngineError::AllocationMismatch { product_id, reason }
            }
            CoreError::NotTracked { product_id } => EngineError::NotTracked { product_id },
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        StoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_surfaces_as_validation() {
        let err: EngineError = StoreError::Duplicate {
            field: "imei".into(),
            value: "356938035643809".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Validation(ValidationError::Duplicate { .. })));
    }

    #[test]
    fn test_db_not_found_keeps_entity() {
        let err: EngineError = DbError::not_found("Sale", "s-1").into();
        assert!(matches!(err, EngineError::NotFound { ref entity, .. } if entity == "Sale"));
    }

    #[test]
    fn test_pool_exhaustion_is_unavailable() {
        let err = StoreError::from(DbError::PoolExhausted);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
