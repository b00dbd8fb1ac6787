//! # agri-scan: Scan Session for Agri Station
//!
//! Drives a capture device until it reads a valid Agri-ID label, then lets go
//! of the device. Used by the station's `scan` commands for logistics
//! verification.
//!
//! ## Module Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          agri-scan                                      │
//! │                                                                         │
//! │  session.rs     ScanSession actor + ScanSessionHandle                  │
//! │       │                                                                 │
//! │       │ uses                                                            │
//! │       ▼                                                                 │
//! │  capability.rs  Camera / CameraProvider traits, DecodeEvent            │
//! │       ▲                                                                 │
//! │       │ implements                                                      │
//! │       │                                                                 │
//! │  device.rs      LineScanner (stdin or device path)                     │
//! │  still.rs       decode_image (image + rqrr), used for uploads          │
//! │                                                                         │
//! │  config.rs      ScanConfig, CameraSettings                             │
//! │  error.rs       ScanError                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agri_scan::{LineScannerProvider, ScanConfig, ScanSession, ScanState};
//!
//! let session = ScanSession::mount(LineScannerProvider, ScanConfig::default(), "-");
//!
//! if let ScanState::Matched(label) = session
//!     .wait_until(|s| matches!(s, ScanState::Matched(_) | ScanState::Error(_)))
//!     .await?
//! {
//!     println!("{} ({})", label.name, label.id);
//! }
//! session.unmount().await?;
//! ```

pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod session;
pub mod still;

pub use capability::{Camera, CameraProvider, DecodeEvent};
pub use config::{CameraSettings, Facing, ScanConfig};
pub use device::{LineScanner, LineScannerProvider, STDIN_TARGET};
pub use error::{ScanError, ScanResult};
pub use session::{NoticeKind, ScanNotice, ScanSession, ScanSessionHandle, ScanState};
