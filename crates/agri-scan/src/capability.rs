//! # Capture Capability
//!
//! The seam between the scan session and whatever turns light (or bytes)
//! into decoded text.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CameraProvider::open(target)      → Camera  (lazy, once per session)  │
//! │                                                                         │
//! │  Camera::start(settings, events)   → resolves when streaming           │
//! │       │                                                                 │
//! │       └──► events: Decoded(text) | Miss   (until stop or drop)         │
//! │                                                                         │
//! │  Camera::stop()                    → stream ends, device released      │
//! │  Camera::clear()                   → drop any render/preview state     │
//! │  Camera::decode_file(image)        → one attempt, text or error        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A camera may keep sending after the session has stopped listening; the
//! session drops its receiver on first match, so late sends fail silently.

use std::future::Future;
use tokio::sync::mpsc;

use crate::config::CameraSettings;
use crate::error::ScanResult;

/// One result from the continuous decode loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A symbol was read.
    Decoded(String),
    /// A frame was examined and held no symbol.
    Miss,
}

/// A capture device bound to one mount target.
///
/// Futures are `Send` so the session can drive acquisition on a separate
/// task while it keeps serving commands.
pub trait Camera: Send + 'static {
    /// Acquires the device and begins the continuous decode loop.
    fn start(
        &mut self,
        settings: &CameraSettings,
        events: mpsc::Sender<DecodeEvent>,
    ) -> impl Future<Output = ScanResult<()>> + Send;

    /// Ends the decode loop and releases the device.
    fn stop(&mut self) -> impl Future<Output = ScanResult<()>> + Send;

    /// Clears presentation state left by a previous run.
    fn clear(&mut self) -> ScanResult<()>;

    /// True while the decode loop runs.
    fn is_scanning(&self) -> bool;

    /// Decodes a single still image.
    fn decode_file(&mut self, image: Vec<u8>) -> impl Future<Output = ScanResult<String>> + Send;
}

/// Creates cameras for mount targets.
pub trait CameraProvider: Send + 'static {
    type Camera: Camera;

    /// Binds a camera to `target`.
    ///
    /// Fails with [`ScanError::TargetMissing`](crate::ScanError::TargetMissing)
    /// when the target does not exist.
    fn open(&self, target: &str) -> ScanResult<Self::Camera>;
}
