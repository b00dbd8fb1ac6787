//! # Scan Commands
//!
//! Logistics verification: read an Agri-ID label from the line scanner or an
//! uploaded photo, then check it against the registry.
//!
//! ## Live Scan Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ScanSession::mount(device)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  wait for Matched | Error ◄───────────────────────┐                    │
//! │       │                                           │                    │
//! │       ├── Matched(label) ──► verify_label ──► report                   │
//! │       │                          │                │                    │
//! │       │                          └── --once? ─no─► scan_next           │
//! │       │                                                                 │
//! │       ├── Error ──► DEVICE_UNAVAILABLE (or end of input after a match) │
//! │       │                                                                 │
//! │       └── Ctrl-C ──► stop                                              │
//! │                                                                         │
//! │  unmount (always)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Notices (rejected text, device errors) go to stderr as they happen.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use agri_core::ParsedRecord;
use agri_scan::{
    LineScannerProvider, NoticeKind, ScanConfig, ScanNotice, ScanSession, ScanSessionHandle,
    ScanState, STDIN_TARGET,
};

use crate::commands::farmer::FarmerDto;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::DbState;

/// How a scanned label compares with the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    /// Registered with the same name and crops.
    Verified,
    /// Registered, but the label disagrees with the stored record.
    Mismatch { registered: FarmerDto },
    /// No farmer with this identifier.
    Unregistered,
}

/// One verified scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub label: ParsedRecord,
    pub verification: Verification,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = &self.label;
        match &self.verification {
            Verification::Verified => write!(
                f,
                "VERIFIED     {} ({}) crops: {}",
                label.name,
                label.id,
                label.crops.join(", ")
            ),
            Verification::Mismatch { registered } => write!(
                f,
                "MISMATCH     {} ({}) label: {} / {}; registry: {} / {}",
                label.name,
                label.id,
                label.name,
                label.crops.join(", "),
                registered.name,
                registered.assigned_crops.join(", ")
            ),
            Verification::Unregistered => write!(
                f,
                "UNREGISTERED {} ({}) crops: {}",
                label.name,
                label.id,
                label.crops.join(", ")
            ),
        }
    }
}

/// Checks a matched label against the registry.
pub async fn verify_label(db: &DbState, label: ParsedRecord) -> ApiResult<ScanOutcome> {
    let verification = match db.inner().farmers().get_by_id(&label.id).await? {
        Some(record) if label.matches(&record) => Verification::Verified,
        Some(record) => Verification::Mismatch {
            registered: FarmerDto::from(record),
        },
        None => Verification::Unregistered,
    };

    info!(id = %label.id, verification = ?verification, "Label checked against registry");
    Ok(ScanOutcome {
        label,
        verification,
    })
}

/// Runs a live scan session on `device` and reports every verified label
/// through `on_outcome`.
///
/// Returns the number of labels handled. With `once`, the session ends
/// after the first match.
///
/// ## Errors
/// - `DEVICE_UNAVAILABLE` when the scanner cannot be opened, or its input
///   ends before any label was read
pub async fn scan_labels<F>(
    db: &DbState,
    config: ScanConfig,
    device: &str,
    once: bool,
    on_outcome: F,
) -> ApiResult<usize>
where
    F: FnMut(&ScanOutcome),
{
    let session = ScanSession::mount(LineScannerProvider, config, device);
    info!(session = %session.id(), device = %device, "Scanning; Ctrl-C to stop");

    let printer = spawn_notice_printer(session.notices());
    let result = drive(db, &session, once, on_outcome).await;

    if let Err(e) = session.unmount().await {
        warn!(error = %e, "Scan session unmount failed");
    }
    printer.abort();
    result
}

async fn drive<F>(
    db: &DbState,
    session: &ScanSessionHandle,
    once: bool,
    mut on_outcome: F,
) -> ApiResult<usize>
where
    F: FnMut(&ScanOutcome),
{
    let settled = |s: &ScanState| matches!(s, ScanState::Matched(_) | ScanState::Error(_));
    let mut handled = 0;

    loop {
        let state = tokio::select! {
            state = session.wait_until(settled) => state?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(handled);
            }
        };

        match state {
            ScanState::Matched(label) => {
                let outcome = verify_label(db, label).await?;
                on_outcome(&outcome);
                handled += 1;

                if once {
                    return Ok(handled);
                }
                session.scan_next().await?;
            }
            ScanState::Error(message) if handled > 0 => {
                info!(reason = %message, handled, "Scanner input ended");
                return Ok(handled);
            }
            ScanState::Error(message) => {
                return Err(ApiError::new(ErrorCode::DeviceUnavailable, message));
            }
            other => debug!(state = %other, "Ignoring state"),
        }
    }
}

fn spawn_notice_printer(mut notices: broadcast::Receiver<ScanNotice>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => print_notice(&notice),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "Notice printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn print_notice(notice: &ScanNotice) {
    let tag = match notice.kind {
        // The registry check prints its own line for a match
        NoticeKind::Matched => return,
        NoticeKind::Rejected => "rejected",
        NoticeKind::DeviceError => "device",
    };
    eprintln!("[{}] {}", tag, notice.message);
}

/// Decodes an uploaded label photo once and verifies it.
///
/// Uses an upload-only session: the live scanner is never started.
pub async fn scan_image(db: &DbState, config: ScanConfig, path: &Path) -> ApiResult<ScanOutcome> {
    debug!(path = ?path, "scan_image command");

    let image = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::not_found("Image", &path.display().to_string()),
        _ => ApiError::io("Failed to read image", e),
    })?;

    let session = ScanSession::mount(
        LineScannerProvider,
        config.auto_start(false),
        STDIN_TARGET,
    );
    let decoded = session.scan_file(image).await;
    if let Err(e) = session.unmount().await {
        warn!(error = %e, "Scan session unmount failed");
    }

    verify_label(db, decoded?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::farmer::register_farmer;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use qrcode::{Color, QrCode};
    use std::io::{Cursor, Write};
    use std::time::Duration;

    fn config() -> ScanConfig {
        ScanConfig::default().settle_delay(Duration::ZERO)
    }

    async fn registry() -> DbState {
        let db = DbState::in_memory().await;
        register_farmer(&db, "F001", "Jane Doe", vec!["Maize".into(), "Rice".into()])
            .await
            .unwrap();
        db
    }

    fn parsed(raw: &str) -> ParsedRecord {
        agri_core::label::decode(raw).unwrap()
    }

    fn device_file(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(lines.as_bytes()).unwrap();
        file
    }

    fn qr_png(payload: &str) -> Vec<u8> {
        const SCALE: u32 = 8;
        const QUIET: u32 = 4;

        let code = QrCode::new(payload.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET) * SCALE;

        let img = GrayImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / SCALE, y / SCALE);
            let inside =
                (QUIET..QUIET + modules).contains(&mx) && (QUIET..QUIET + modules).contains(&my);
            if inside && colors[((my - QUIET) * modules + (mx - QUIET)) as usize] == Color::Dark {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });

        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_verify_label_outcomes() {
        let db = registry().await;

        let outcome = verify_label(&db, parsed("AGRI-v1|F001|Jane Doe|Maize,Rice"))
            .await
            .unwrap();
        assert_eq!(outcome.verification, Verification::Verified);

        let outcome = verify_label(&db, parsed("AGRI-v1|F001|Jane Doe|Maize"))
            .await
            .unwrap();
        assert!(matches!(
            outcome.verification,
            Verification::Mismatch { ref registered } if registered.assigned_crops == ["Maize", "Rice"]
        ));

        let outcome = verify_label(&db, parsed("AGRI-v1|F999|Ghost|Cotton"))
            .await
            .unwrap();
        assert_eq!(outcome.verification, Verification::Unregistered);
    }

    #[tokio::test]
    async fn test_outcome_json_shape() {
        let db = registry().await;
        let outcome = verify_label(&db, parsed("AGRI-v1|F001|Jane Doe|Maize,Rice"))
            .await
            .unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["verification"]["status"], "verified");
        assert_eq!(json["label"]["id"], "F001");
    }

    #[tokio::test]
    async fn test_scan_once_from_device() {
        let db = registry().await;
        let device = device_file("\nnot a label\nAGRI-v1|F001|Jane Doe|Maize,Rice\n");
        let mut seen = Vec::new();

        let handled = scan_labels(
            &db,
            config(),
            device.path().to_str().unwrap(),
            true,
            |outcome| seen.push(outcome.clone()),
        )
        .await
        .unwrap();

        assert_eq!(handled, 1);
        assert_eq!(seen[0].label.id, "F001");
        assert_eq!(seen[0].verification, Verification::Verified);
    }

    #[tokio::test]
    async fn test_scan_reads_each_label_once_then_ends() {
        let db = registry().await;
        let device = device_file("AGRI-v1|F001|Jane Doe|Maize,Rice\nAGRI-v1|F002|Amina|Rice\n");
        let mut ids = Vec::new();

        let handled = tokio::time::timeout(
            Duration::from_secs(5),
            scan_labels(&db, config(), device.path().to_str().unwrap(), false, |outcome| {
                ids.push(outcome.label.id.clone())
            }),
        )
        .await
        .expect("scan should end at end of input")
        .unwrap();

        assert_eq!(handled, 2);
        assert_eq!(ids, ["F001", "F002"]);
    }

    #[tokio::test]
    async fn test_scan_without_label_reports_device_error() {
        let db = registry().await;
        let device = device_file("hello\n");

        let err = scan_labels(&db, config(), device.path().to_str().unwrap(), false, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DeviceUnavailable);
    }

    #[tokio::test]
    async fn test_scan_missing_device() {
        let db = registry().await;

        let err = scan_labels(&db, config(), "/nonexistent/ttyAGRI", true, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DeviceUnavailable);
        assert_eq!(err.message, "Scan target not found: /nonexistent/ttyAGRI");
    }

    #[tokio::test]
    async fn test_scan_image_verifies_label() {
        let db = registry().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        std::fs::write(&path, qr_png("AGRI-v1|F001|Jane Doe|Maize,Rice")).unwrap();

        let outcome = scan_image(&db, config(), &path).await.unwrap();

        assert_eq!(outcome.verification, Verification::Verified);
    }

    #[tokio::test]
    async fn test_scan_image_failures() {
        let db = registry().await;
        let dir = tempfile::tempdir().unwrap();

        let missing = scan_image(&db, config(), &dir.path().join("nope.png"))
            .await
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::NotFound);

        let blank = dir.path().join("blank.png");
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([255u8])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        std::fs::write(&blank, buf).unwrap();

        let err = scan_image(&db, config(), &blank).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SymbolNotFound);
        assert_eq!(err.message, "Could not find QR code in image");

        let foreign = dir.path().join("wifi.png");
        std::fs::write(&foreign, qr_png("WIFI:S:farm;T:WPA;P:secret;;")).unwrap();
        let err = scan_image(&db, config(), &foreign).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::LabelRejected);
    }
}
