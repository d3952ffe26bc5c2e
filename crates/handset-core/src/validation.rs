//! # Validation Module
//!
//! Input rules checked before the engine issues any write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Orchestrator (Rust)                                          │
//! │  └── THIS MODULE: IMEI, quantities, money, names                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on status columns                               │
//! │  └── Partial UNIQUE index on live IMEIs                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use handset_core::validation::{normalize_imei, validate_quantity};
//!
//! assert_eq!(normalize_imei("35-693803-564380-9").unwrap(), "356938035643809");
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{IMEI_LENGTHS, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// IMEI
// =============================================================================

/// Normalises and validates an IMEI.
///
/// ## Rules
/// - Whitespace and dashes are stripped (scanners and humans both add them)
/// - What remains must be 15 or 17 ASCII digits
///
/// Returns the normalised form, which is the only form ever stored.
///
/// ```rust
/// use handset_core::validation::normalize_imei;
///
/// assert_eq!(normalize_imei(" 123456789012345 ").unwrap(), "123456789012345");
/// assert!(normalize_imei("12345").is_err());
/// assert!(normalize_imei("12345678901234X").is_err());
/// ```
pub fn normalize_imei(raw: &str) -> ValidationResult<String> {
    let imei: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if imei.is_empty() {
        return Err(ValidationError::required("imei"));
    }

    if !imei.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "imei",
            "must contain only digits",
        ));
    }

    if !IMEI_LENGTHS.contains(&imei.len()) {
        return Err(ValidationError::invalid_format(
            "imei",
            format!("must be 15 or 17 digits, got {}", imei.len()),
        ));
    }

    Ok(imei)
}

/// Normalises a batch of IMEIs, rejecting duplicates within the batch.
pub fn normalize_imeis<S: AsRef<str>>(raw: &[S]) -> ValidationResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for r in raw {
        let imei = normalize_imei(r.as_ref())?;
        if out.contains(&imei) {
            return Err(ValidationError::duplicate("imei", imei));
        }
        out.push(imei);
    }
    Ok(out)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product or customer).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional SKU.
///
/// Letters, digits, hyphens and underscores, at most 50 characters.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: 1..=MAX_ITEM_QUANTITY.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount (prices, costs, totals, refunds).
///
/// Zero is allowed (free accessories, zero-value trade-ins).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a strictly positive amount (payments, debts).
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates the number of lines on a sale or return.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::required("items"));
    }

    if lines > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Checks that a customer's balance covers the credit being applied.
pub fn validate_credit_available(available: Money, requested: Money) -> ValidationResult<()> {
    if requested > available {
        return Err(ValidationError::InsufficientCredit {
            available: available.to_string(),
            requested: requested.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_imei() {
        assert_eq!(normalize_imei("123456789012345").unwrap(), "123456789012345");
        assert_eq!(
            normalize_imei("35 693803 564380 9").unwrap(),
            "356938035643809"
        );
        assert_eq!(
            normalize_imei("12345678901234567").unwrap(),
            "12345678901234567"
        );

        assert!(matches!(
            normalize_imei("  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(normalize_imei("1234567890123456").is_err());
        assert!(normalize_imei("12345678901234a").is_err());
        assert!(normalize_imei("١٢٣٤٥٦٧٨٩٠١٢٣٤٥").is_err());
    }

    #[test]
    fn test_normalize_imeis_rejects_batch_duplicates() {
        let ok = normalize_imeis(&["123456789012345", "123456789012346"]).unwrap();
        assert_eq!(ok.len(), 2);

        let err = normalize_imeis(&["123456789012345", "12345-6789012345"]).unwrap_err();
        assert_eq!(err, ValidationError::duplicate("imei", "123456789012345"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "iPhone 13 128GB").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("IP13-128").is_ok());
        assert!(validate_sku("has space").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_money_validators() {
        assert!(validate_non_negative("price", Money::zero()).is_ok());
        assert!(validate_non_negative("price", Money::from_cents(-1)).is_err());
        assert!(validate_positive("amount", Money::from_cents(1)).is_ok());
        assert!(validate_positive("amount", Money::zero()).is_err());
    }

    #[test]
    fn test_credit_available() {
        assert!(validate_credit_available(Money::from_cents(500), Money::from_cents(500)).is_ok());

        let err = validate_credit_available(Money::from_cents(500), Money::from_cents(501))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient store credit: available 5.00, requested 5.01"
        );
    }

    #[test]
    fn test_line_count() {
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS + 1).is_err());
    }
}
