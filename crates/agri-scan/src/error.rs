//! # Scan Error Types
//!
//! Error types for the scan session and its capture sources.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Acquisition    │  │   Decoding      │  │     Session             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  DeviceUnavail. │  │  SymbolNotFound │  │  SessionBusy            │ │
//! │  │  TargetMissing  │  │  InvalidImage   │  │  SessionClosed          │ │
//! │  │                 │  │  Label          │  │  Internal               │ │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────────────────┘ │
//! │           │                    │                                        │
//! │           ▼                    ▼                                        │
//! │     state → Error        notice, state unchanged (live) or Idle (file) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use agri_core::LabelError;
use thiserror::Error;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Notice text for a still image with no readable symbol.
pub const NO_SYMBOL_NOTICE: &str = "Could not find QR code in image";

/// Scan error type covering acquisition, decoding and session misuse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    // =========================================================================
    // Acquisition Errors
    // =========================================================================
    /// The capture device could not be opened or started (permission
    /// denied, no device, device busy).
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The session's mount target does not exist.
    #[error("Scan target not found: {0}")]
    TargetMissing(String),

    // =========================================================================
    // Decoding Errors
    // =========================================================================
    /// A still image contained no decodable QR symbol.
    #[error("{}", NO_SYMBOL_NOTICE)]
    SymbolNotFound,

    /// Uploaded bytes are not a supported image.
    #[error("Unreadable image: {0}")]
    InvalidImage(String),

    /// Decoded text is not an Agri-ID label.
    #[error(transparent)]
    Label(#[from] LabelError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The request is not allowed in the session's current state.
    #[error("Scan session is busy ({0})")]
    SessionBusy(String),

    /// The session has been unmounted.
    #[error("Scan session closed")]
    SessionClosed,

    /// Unexpected failure inside the session (task panic, lost resource).
    #[error("Internal scanner error: {0}")]
    Internal(String),
}

impl ScanError {
    /// Text published to the operator when this error ends a still-image
    /// decode.
    ///
    /// Label rejections keep their own wording; everything else reads as
    /// "no symbol found".
    pub fn upload_notice(&self) -> String {
        match self {
            ScanError::Label(e) => e.to_string(),
            _ => NO_SYMBOL_NOTICE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_notice() {
        assert_eq!(ScanError::SymbolNotFound.upload_notice(), NO_SYMBOL_NOTICE);
        assert_eq!(
            ScanError::InvalidImage("truncated".into()).upload_notice(),
            NO_SYMBOL_NOTICE
        );
        assert_eq!(
            ScanError::Label(LabelError::InvalidFormat).upload_notice(),
            "Invalid Agri-ID Format"
        );
    }
}
