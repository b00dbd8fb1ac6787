//! # Error Types
//!
//! Domain-specific error types for agri-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agri-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Registration field failures                    │
//! │  └── LabelError       - Scanned payload rejected by the codec          │
//! │                                                                         │
//! │  agri-db errors        └── DbError   - Database operation failures     │
//! │  agri-scan errors      └── ScanError - Camera / decoder failures       │
//! │  station errors        └── ApiError  - What the operator sees          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError/ScanError → ApiError      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No farmer is registered under this identifier.
    #[error("Farmer not found: {0}")]
    FarmerNotFound(String),

    /// A farmer with this identifier is already registered.
    #[error("Farmer '{0}' is already registered")]
    DuplicateFarmer(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Label payload rejected (wraps LabelError).
    #[error("Label error: {0}")]
    Label(#[from] LabelError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for farmer registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A list field has no entries.
    #[error("At least one {field} is required")]
    EmptyList { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Field contains a character reserved by the label format.
    #[error("{field} must not contain '{character}'")]
    ReservedCharacter { field: String, character: char },
}

// =============================================================================
// Label Error
// =============================================================================

/// Reasons a scanned payload is not an Agri-ID label.
///
/// Each variant carries the notice shown to the operator while the camera
/// keeps scanning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// Payload does not begin with the `AGRI-v1` version tag.
    #[error("Invalid Agri-ID Format")]
    InvalidFormat,

    /// Fewer than four `|`-separated segments.
    #[error("Incomplete QR Data ({segments} of 4 fields)")]
    IncompleteData { segments: usize },

    /// Payload could not be assembled into a record.
    #[error("Failed to parse QR code: {0}")]
    ParseFailure(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for label decoding.
pub type LabelResult<T> = Result<T, LabelError>;
