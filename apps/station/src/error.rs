//! # API Error Type
//!
//! Unified error type for station commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Agri Station                           │
//! │                                                                         │
//! │  station show F404                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  ApiResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::NotFound ──────────┐              │  │
//! │  │         │                                         │              │  │
//! │  │         ▼                                         ▼              │  │
//! │  │  Scan Error? ─────── ScanError::SymbolNotFound ── ApiError ────► │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────► │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr:  error: Farmer not found: F404                                │
//! │  --json:  {"code":"NOT_FOUND","message":"Farmer not found: F404"}      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail; the operator only sees a
//! generic message.

use serde::Serialize;
use tracing::{debug, error};

use agri_core::{CoreError, LabelError, ValidationError};
use agri_db::DbError;
use agri_scan::ScanError;

use crate::state::ConfigError;

/// Result alias for station commands.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from station commands.
///
/// ## Serialization
/// With `--json`, a failed command prints:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Farmer not found: F404"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No farmer with that identifier
    NotFound,

    /// Identifier already registered, or the session is busy
    Conflict,

    /// Registration input failed validation
    ValidationError,

    /// Scanned text is not an Agri-ID label
    LabelRejected,

    /// Scanner could not be opened or stopped delivering
    DeviceUnavailable,

    /// Image holds no readable QR symbol
    SymbolNotFound,

    /// Database operation failed
    DatabaseError,

    /// Configuration could not be loaded
    ConfigError,

    /// Anything else
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Wraps a file system failure, logging the detail.
    pub fn io(context: &str, err: std::io::Error) -> Self {
        error!(error = %err, "{}", context);
        ApiError::internal(format!("{}: {}", context, err.kind()))
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Invalid(e) => ApiError::from(e),
            DbError::CorruptRow { entity, id, reason } => {
                error!(%entity, %id, %reason, "Stored row is unreadable");
                ApiError::new(
                    ErrorCode::DatabaseError,
                    format!("Stored {} '{}' is unreadable", entity, id),
                )
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FarmerNotFound(id) => ApiError::not_found("Farmer", &id),
            CoreError::DuplicateFarmer(id) => ApiError::new(
                ErrorCode::Conflict,
                format!("Farmer '{}' is already registered", id),
            ),
            CoreError::Validation(e) => ApiError::from(e),
            CoreError::Label(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<LabelError> for ApiError {
    fn from(err: LabelError) -> Self {
        ApiError::new(ErrorCode::LabelRejected, err.to_string())
    }
}

/// Converts scan errors to API errors.
///
/// Image failures carry the same message the operator sees as a notice.
impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::DeviceUnavailable(_) | ScanError::TargetMissing(_) => {
                ApiError::new(ErrorCode::DeviceUnavailable, err.to_string())
            }
            ScanError::SymbolNotFound => {
                ApiError::new(ErrorCode::SymbolNotFound, err.upload_notice())
            }
            ScanError::InvalidImage(ref detail) => {
                debug!(%detail, "Image could not be read");
                ApiError::new(ErrorCode::SymbolNotFound, err.upload_notice())
            }
            ScanError::Label(e) => ApiError::from(e),
            ScanError::SessionBusy(_) => ApiError::new(ErrorCode::Conflict, err.to_string()),
            ScanError::SessionClosed | ScanError::Internal(_) => {
                error!(error = %err, "Scan session failed");
                ApiError::internal("Scan session failed")
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_codes() {
        let err = ApiError::from(DbError::not_found("Farmer", "F404"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Farmer not found: F404");

        let err = ApiError::from(DbError::duplicate("id", "F001"));
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "id 'F001' already exists");

        let err = ApiError::from(DbError::QueryFailed("syntax error near SELEKT".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEKT"));
    }

    #[test]
    fn test_scan_errors_use_operator_notices() {
        let err = ApiError::from(ScanError::InvalidImage("bad PNG signature".into()));
        assert_eq!(err.code, ErrorCode::SymbolNotFound);
        assert_eq!(err.message, "Could not find QR code in image");

        let err = ApiError::from(ScanError::Label(LabelError::InvalidFormat));
        assert_eq!(err.code, ErrorCode::LabelRejected);
        assert_eq!(err.message, "Invalid Agri-ID Format");

        let err = ApiError::from(ScanError::TargetMissing("/dev/ttyACM9".into()));
        assert_eq!(err.code, ErrorCode::DeviceUnavailable);
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = ApiError::from(DbError::Invalid(ValidationError::Required {
            field: "Name".into(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Name is required");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(ApiError::not_found("Farmer", "F9")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Farmer not found: F9");
    }
}
