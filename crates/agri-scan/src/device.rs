//! # Line-Oriented Scanner Devices
//!
//! Handheld and serial QR scanners present themselves as a text stream that
//! emits one decoded payload per line. This module adapts such a stream to
//! the [`Camera`] capability.
//!
//! ## Targets
//! ```text
//! "-"              → process stdin (keyboard-wedge scanners, piped input)
//! "/dev/ttyACM0"   → device or FIFO path, opened on first start
//! ```
//!
//! Each non-empty line (trimmed) becomes [`DecodeEvent::Decoded`]; an empty
//! line is a frame with no symbol ([`DecodeEvent::Miss`]). End of stream
//! closes the event channel.
//!
//! ## Runs
//! ```text
//! start ──► pump reads ──► accepted label ──► holds ──► stop ──► Paused
//!              │                                                  │
//!              └── end of stream ──► Ended (start fails)          │
//!                                                                 │
//! start ◄──────────── next unread line ◄──────────────────────────┘
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use agri_core::label;

use crate::capability::{Camera, CameraProvider, DecodeEvent};
use crate::config::CameraSettings;
use crate::error::{ScanError, ScanResult};
use crate::still;

/// Target name for standard input.
pub const STDIN_TARGET: &str = "-";

type LineReader = Split<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    Path(PathBuf),
}

impl Source {
    async fn open(&self) -> ScanResult<LineReader> {
        let input: Box<dyn AsyncRead + Send + Unpin> = match self {
            Source::Stdin => Box::new(tokio::io::stdin()),
            Source::Path(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    ScanError::DeviceUnavailable(format!("{}: {e}", path.display()))
                })?;
                Box::new(file)
            }
        };
        Ok(BufReader::new(input).split(b'\n'))
    }
}

/// Where the scanner's input stream currently lives.
enum Feed {
    /// Not opened yet.
    Closed,
    /// Opened and idle between runs.
    Paused(LineReader),
    /// Owned by the pump task, which hands it back when cancelled.
    Running {
        cancel: oneshot::Sender<()>,
        task: JoinHandle<Option<LineReader>>,
    },
    /// End of stream or read error; nothing more will arrive.
    Ended,
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feed::Closed => "Closed",
            Feed::Paused(_) => "Paused",
            Feed::Running { .. } => "Running",
            Feed::Ended => "Ended",
        })
    }
}

/// Opens [`LineScanner`]s for stdin or device paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineScannerProvider;

impl CameraProvider for LineScannerProvider {
    type Camera = LineScanner;

    fn open(&self, target: &str) -> ScanResult<LineScanner> {
        if target == STDIN_TARGET {
            return Ok(LineScanner::new(Source::Stdin));
        }

        let path = Path::new(target);
        if !path.exists() {
            return Err(ScanError::TargetMissing(target.to_string()));
        }
        Ok(LineScanner::new(Source::Path(path.to_path_buf())))
    }
}

/// A scanner that reads decoded payloads line by line.
///
/// The source is opened on the first start and read sequentially across
/// start/stop cycles: a restart continues with the next unread line.
#[derive(Debug)]
pub struct LineScanner {
    source: Source,
    feed: Feed,
}

impl LineScanner {
    fn new(source: Source) -> Self {
        LineScanner {
            source,
            feed: Feed::Closed,
        }
    }

    fn ended(&self) -> ScanError {
        let source = match &self.source {
            Source::Stdin => "stdin".to_string(),
            Source::Path(path) => path.display().to_string(),
        };
        ScanError::DeviceUnavailable(format!("{source}: scanner stream ended"))
    }
}

impl Camera for LineScanner {
    async fn start(
        &mut self,
        settings: &CameraSettings,
        events: mpsc::Sender<DecodeEvent>,
    ) -> ScanResult<()> {
        if self.is_scanning() {
            return Ok(());
        }

        // Frame rate and scan region belong to the device itself
        debug!(facing = %settings.facing, fps = settings.fps, "Line scanner ignores optical settings");

        let lines = match std::mem::replace(&mut self.feed, Feed::Ended) {
            Feed::Closed => match self.source.open().await {
                Ok(lines) => lines,
                Err(e) => {
                    self.feed = Feed::Closed;
                    return Err(e);
                }
            },
            Feed::Paused(lines) => lines,
            // Pump finished on its own: only end of stream gets here
            Feed::Running { task, .. } => match task.await {
                Ok(Some(lines)) => lines,
                _ => return Err(self.ended()),
            },
            Feed::Ended => return Err(self.ended()),
        };

        let (cancel, cancelled) = oneshot::channel();
        let task = tokio::spawn(pump(lines, events, cancelled));
        self.feed = Feed::Running { cancel, task };

        info!(source = ?self.source, "Line scanner started");
        Ok(())
    }

    async fn stop(&mut self) -> ScanResult<()> {
        match std::mem::replace(&mut self.feed, Feed::Ended) {
            Feed::Running { cancel, task } => {
                // Fails only when the pump already finished
                let _ = cancel.send(());
                self.feed = match task.await {
                    Ok(Some(lines)) => Feed::Paused(lines),
                    Ok(None) => Feed::Ended,
                    Err(e) => return Err(ScanError::Internal(e.to_string())),
                };
                info!(source = ?self.source, feed = ?self.feed, "Line scanner stopped");
            }
            other => self.feed = other,
        }
        Ok(())
    }

    fn clear(&mut self) -> ScanResult<()> {
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        matches!(&self.feed, Feed::Running { task, .. } if !task.is_finished())
    }

    async fn decode_file(&mut self, image: Vec<u8>) -> ScanResult<String> {
        tokio::task::spawn_blocking(move || still::decode_image(&image))
            .await
            .map_err(|e| ScanError::Internal(e.to_string()))?
    }
}

/// Forwards lines from `lines` until cancelled, end of stream, or an
/// accepted label.
///
/// ## Rules
/// - A slot in `events` is reserved before a line is read, so a line taken
///   off the stream is always delivered.
/// - After forwarding a line the label codec accepts, nothing more is read
///   until `cancel` fires: the session ends the run on that label, and the
///   following lines belong to the next run.
/// - Returns the reader when cancelled, `None` at end of stream.
async fn pump(
    mut lines: LineReader,
    events: mpsc::Sender<DecodeEvent>,
    mut cancel: oneshot::Receiver<()>,
) -> Option<LineReader> {
    loop {
        let permit = tokio::select! {
            biased;
            _ = &mut cancel => return Some(lines),
            permit = events.reserve() => permit.ok(),
        };
        let Some(permit) = permit else {
            // Receiver gone: keep the rest for the next run
            let _ = cancel.await;
            return Some(lines);
        };

        let segment = tokio::select! {
            biased;
            _ = &mut cancel => None,
            segment = lines.next_segment() => Some(segment),
        };
        let raw = match segment {
            None => return Some(lines),
            Some(Ok(Some(raw))) => raw,
            Some(Ok(None)) => {
                debug!("Scanner stream reached end");
                return None;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Scanner stream read failed");
                return None;
            }
        };

        let raw = raw.trim_ascii();
        if raw.is_empty() {
            permit.send(DecodeEvent::Miss);
            continue;
        }

        let accepted = label::decode_bytes(raw).is_ok();
        permit.send(DecodeEvent::Decoded(String::from_utf8_lossy(raw).into_owned()));

        if accepted {
            let _ = cancel.await;
            return Some(lines);
        }
    }
}
