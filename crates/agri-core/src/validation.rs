//! # Validation Module
//!
//! Registration rules for farmer records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: station CLI                                                  │
//! │  └── Argument parsing (clap)                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields ("ID is required", ...)                           │
//! │  └── Label-safe characters (no '|' in fields, no ',' in crops)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── PRIMARY KEY on id (duplicate registration)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The label format has no escaping, so a `|` inside any field (or a `,`
//! inside a crop name) would decode into a different record. Those characters
//! are refused here, at registration, rather than in the codec.

use crate::error::ValidationError;
use crate::label::{CROP_SEPARATOR, FIELD_DELIMITER};
use crate::types::FarmerRecord;
use crate::{MAX_ID_LEN, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a farmer identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Must not contain `|`
///
/// ## Example
/// ```rust
/// use agri_core::validation::validate_farmer_id;
///
/// assert!(validate_farmer_id("F001").is_ok());
/// assert!(validate_farmer_id("").is_err());
/// assert!(validate_farmer_id("F|1").is_err());
/// ```
pub fn validate_farmer_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "ID".to_string(),
        });
    }

    if id.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "ID".to_string(),
            max: MAX_ID_LEN,
        });
    }

    reject_reserved("ID", id, &[FIELD_DELIMITER])
}

/// Validates a farmer display name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
/// - Must not contain `|` (commas are fine: only the crop segment is
///   comma-split)
pub fn validate_farmer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "Name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "Name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    reject_reserved("Name", name, &[FIELD_DELIMITER])
}

/// Validates the assigned crop list.
///
/// ## Rules
/// - At least one crop
/// - Each crop non-empty, without `|` or `,`
/// - Crops outside [`crate::CROP_OPTIONS`] are accepted
pub fn validate_crops(crops: &[String]) -> ValidationResult<()> {
    if crops.is_empty() {
        return Err(ValidationError::EmptyList {
            field: "crop".to_string(),
        });
    }

    for crop in crops {
        let crop = crop.trim();
        if crop.is_empty() {
            return Err(ValidationError::Required {
                field: "Crop name".to_string(),
            });
        }
        reject_reserved("Crop name", crop, &[FIELD_DELIMITER, CROP_SEPARATOR])?;
    }

    Ok(())
}

/// Validates every field of a record.
pub fn validate_farmer(record: &FarmerRecord) -> ValidationResult<()> {
    validate_farmer_id(&record.id)?;
    validate_farmer_name(&record.name)?;
    validate_crops(&record.assigned_crops)
}

fn reject_reserved(field: &str, value: &str, reserved: &[char]) -> ValidationResult<()> {
    match value.chars().find(|c| reserved.contains(c)) {
        Some(character) => Err(ValidationError::ReservedCharacter {
            field: field.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
