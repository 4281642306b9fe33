//! # Validation Module
//!
//! Input validation for ledger intents and admin edits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard forms                                              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any ledger state is read)                │
//! │  ├── quantities, prices, identity fields                               │
//! │  └── status / company / brand names                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (remaining_qty BETWEEN 0 AND quantity)                      │
//! │  ├── UNIQUE (reverted_from_id)                                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use jazzy_core::validation::{validate_quantity, validate_style_number};
//!
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_quantity(0).is_err());
//! assert!(validate_style_number("GG0002").is_ok());
//! ```

use crate::error::ValidationError;
use crate::MAX_TRANSACTION_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Frame constructions the dashboard offers.
pub const FRAME_TYPES: [&str; 5] = ["Zyl", "Metal", "Rimless", "Semi-rimless", "Clip"];

/// Product categories.
pub const PRODUCT_TYPES: [&str; 2] = ["Optical", "Sunglasses"];

const MAX_STATUS_NAME_LEN: usize = 50;
const MAX_COMPANY_NAME_LEN: usize = 255;
const MAX_BRAND_NAME_LEN: usize = 255;
const MAX_IDENTITY_PART_LEN: usize = 50;
const MAX_NOTES_LEN: usize = 1000;
const MAX_ALLOCATION: i64 = 999;

// =============================================================================
// Identity Fields
// =============================================================================

/// Validates one segment of a composite id (style number, color code, eye size).
///
/// Segments are joined with `-`, so they may contain letters, digits, dots,
/// slashes and spaces but not hyphens. A hyphen inside a segment would make
/// two different identities produce the same composite id.
fn validate_identity_part(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTITY_PART_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTITY_PART_LEN,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '/' | ' ' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, spaces, dots, slashes and underscores"
                .to_string(),
        });
    }

    Ok(())
}

pub fn validate_style_number(style_number: &str) -> ValidationResult<()> {
    validate_identity_part("styleNumber", style_number)
}

pub fn validate_color_code(color_code: &str) -> ValidationResult<()> {
    validate_identity_part("colorCode", color_code)
}

pub fn validate_eye_size(eye_size: &str) -> ValidationResult<()> {
    validate_identity_part("eyeSize", eye_size)
}

pub fn validate_frame_type(frame_type: &str) -> ValidationResult<()> {
    one_of("frameType", frame_type, &FRAME_TYPES)
}

pub fn validate_product_type(product_type: &str) -> ValidationResult<()> {
    one_of("productType", product_type, &PRODUCT_TYPES)
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ValidationResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of a sale, write-off, restock or intake.
///
/// ## Rules
/// - Must be positive (at least 1)
/// - Must not exceed [`MAX_TRANSACTION_QUANTITY`]
///
/// Stock availability is checked later against the snapshot.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_TRANSACTION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_TRANSACTION_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit cost in cents. Zero is allowed (samples, freebies).
pub fn validate_unit_cost(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unitCost".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a retail/list price in cents. Zero is allowed.
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unitPrice".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a sale price override; a recorded sale must bring in money.
pub fn validate_sale_price(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "salePrice".to_string(),
        });
    }
    Ok(())
}

pub fn validate_allocation(allocation: i64) -> ValidationResult<()> {
    if !(0..=MAX_ALLOCATION).contains(&allocation) {
        return Err(ValidationError::OutOfRange {
            field: "allocationQuantity".to_string(),
            min: 0,
            max: MAX_ALLOCATION,
        });
    }
    Ok(())
}

/// Brand ids are chosen by the business and prefix every composite id.
pub fn validate_brand_id(brand_id: i64) -> ValidationResult<()> {
    if brand_id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "brandId".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Names and Free Text
// =============================================================================

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a status name. Returns the trimmed name.
pub fn validate_status_name(name: &str) -> ValidationResult<String> {
    validate_name("name", name, MAX_STATUS_NAME_LEN)
}

/// Validates a company name. Returns the trimmed name.
pub fn validate_company_name(name: &str) -> ValidationResult<String> {
    validate_name("companyName", name, MAX_COMPANY_NAME_LEN)
}

/// Validates a brand name. Returns the trimmed name.
pub fn validate_brand_name(name: &str) -> ValidationResult<String> {
    validate_name("brandName", name, MAX_BRAND_NAME_LEN)
}

/// Normalizes optional notes: blank becomes `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identity_parts() {
        assert!(validate_style_number("GG0002").is_ok());
        assert!(validate_color_code("TRT").is_ok());
        assert!(validate_eye_size("54").is_ok());
        assert!(validate_style_number("").is_err());
        assert!(validate_style_number("   ").is_err());
        assert!(validate_style_number(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_identity_part_rejects_separator() {
        let err = validate_color_code("TRT-2").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_validate_frame_and_product_types() {
        assert!(validate_frame_type("Zyl").is_ok());
        assert!(validate_frame_type("Semi-rimless").is_ok());
        assert!(validate_frame_type("Plastic").is_err());
        assert!(validate_product_type("Sunglasses").is_ok());
        assert!(validate_product_type("Sun").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_TRANSACTION_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-3).is_err());
        assert!(matches!(
            validate_quantity(MAX_TRANSACTION_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_prices() {
        assert!(validate_unit_cost(0).is_ok());
        assert!(validate_unit_cost(-1).is_err());
        assert!(validate_unit_price(25000).is_ok());
        assert!(validate_sale_price(1).is_ok());
        assert!(validate_sale_price(0).is_err());
    }

    #[test]
    fn test_validate_allocation() {
        assert!(validate_allocation(0).is_ok());
        assert!(validate_allocation(999).is_ok());
        assert!(validate_allocation(1000).is_err());
        assert!(validate_allocation(-1).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert_eq!(validate_status_name("  On Hold ").unwrap(), "On Hold");
        assert!(validate_status_name(&"A".repeat(51)).is_err());
        assert!(validate_company_name("").is_err());
        assert!(validate_company_name(&"A".repeat(256)).is_err());
        assert_eq!(validate_brand_name("Gucci").unwrap(), "Gucci");
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some(" cracked lens ")).unwrap(),
            Some("cracked lens".to_string())
        );
        assert!(validate_notes(Some(&"x".repeat(1001))).is_err());
    }
}
