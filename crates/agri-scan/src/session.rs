//! # Scan Session
//!
//! Actor that owns one camera for the lifetime of a mounted scanner view and
//! turns its decode stream into at most one matched label per scan.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Session States                               │
//! │                                                                         │
//! │   mount ──(settle)──┐                                                   │
//! │                     ▼                                                   │
//! │  ┌────────┐  start  ┌──────────┐  acquired  ┌──────────┐               │
//! │  │  Idle  │ ──────► │ Starting │ ─────────► │ Scanning │ ◄──┐          │
//! │  └────────┘         └────┬─────┘            └────┬─────┘    │ invalid   │
//! │   ▲  ▲  ▲                │ failed                │          │ text /    │
//! │   │  │  │                ▼                       │ valid    │ miss      │
//! │   │  │  │           ┌─────────┐                  ├──────────┘           │
//! │   │  │  │  start    │  Error  │                  ▼                      │
//! │   │  │  └────────── └─────────┘            ┌──────────┐                │
//! │   │  │                                     │ Matched  │                │
//! │   │  └──── scan next (settle, re-acquire) ─┴──────────┘                │
//! │   │                                                                     │
//! │   └── stop / file upload begins / file decode fails                    │
//! │                                                                         │
//! │  File upload (any state but Starting): stop camera → Idle → decode     │
//! │  once → Matched (valid) or Idle + notice (invalid / no symbol)         │
//! │                                                                         │
//! │  Unmount (any state): release camera, exit. A pending acquisition is   │
//! │  awaited and released the moment it resolves.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! The camera lives inside the actor. While an acquisition or a file decode
//! runs, the camera is moved into that task and handed back on completion,
//! so the actor keeps serving commands in the meantime.

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use agri_core::{label, ParsedRecord};

use crate::capability::{Camera, CameraProvider, DecodeEvent};
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 32;
const NOTICE_BUFFER: usize = 32;

/// Notice published when a label is accepted.
pub const MATCHED_NOTICE: &str = "Verified Farmer";

// =============================================================================
// Public Types
// =============================================================================

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ScanState {
    /// No camera running.
    Idle,
    /// Camera acquisition in flight.
    Starting,
    /// Decode loop running.
    Scanning,
    /// A valid label was read; the camera has been released.
    Matched(ParsedRecord),
    /// Acquisition failed; `start` retries.
    Error(String),
}

impl ScanState {
    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Starting => "starting",
            ScanState::Scanning => "scanning",
            ScanState::Matched(_) => "matched",
            ScanState::Error(_) => "error",
        }
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Category of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A label was accepted.
    Matched,
    /// Scanned text or an uploaded image was rejected; scanning goes on.
    Rejected,
    /// The camera could not be started.
    DeviceError,
}

/// A transient message for the operator (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl ScanNotice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        ScanNotice {
            kind,
            message: message.into(),
        }
    }
}

// =============================================================================
// Session Handle
// =============================================================================

enum Command {
    Start(oneshot::Sender<ScanResult<()>>),
    Stop(oneshot::Sender<ScanResult<()>>),
    ScanNext(oneshot::Sender<ScanResult<()>>),
    ScanFile {
        image: Vec<u8>,
        reply: oneshot::Sender<ScanResult<ParsedRecord>>,
    },
    Unmount(oneshot::Sender<()>),
}

/// Handle for driving a mounted scan session.
///
/// Dropping the handle without [`unmount`](Self::unmount) tears the session
/// down the same way.
#[derive(Debug)]
pub struct ScanSessionHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ScanState>,
    notices: broadcast::Sender<ScanNotice>,
}

impl ScanSessionHandle {
    /// Session correlation ID (appears in logs as `session`).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change. Its `changed()` fails
    /// once the session has fully torn down.
    pub fn watch(&self) -> watch::Receiver<ScanState> {
        self.state.clone()
    }

    /// Subscribes to operator notices.
    pub fn notices(&self) -> broadcast::Receiver<ScanNotice> {
        self.notices.subscribe()
    }

    /// Waits until the state satisfies `predicate` and returns it.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&ScanState) -> bool,
    ) -> ScanResult<ScanState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| ScanError::SessionClosed)?;
        Ok(state.clone())
    }

    /// Starts the camera now (from `Idle` or `Error`).
    ///
    /// Resolves once acquisition has begun; watch the state for `Scanning`.
    pub async fn start(&self) -> ScanResult<()> {
        self.request(Command::Start).await
    }

    /// Stops the camera. A pending acquisition is released when it resolves.
    pub async fn stop(&self) -> ScanResult<()> {
        self.request(Command::Stop).await
    }

    /// Clears the matched record and re-acquires after the settle delay.
    pub async fn scan_next(&self) -> ScanResult<()> {
        self.request(Command::ScanNext).await
    }

    /// Stops any live scan and decodes `image` once.
    pub async fn scan_file(&self, image: Vec<u8>) -> ScanResult<ParsedRecord> {
        self.request(|reply| Command::ScanFile { image, reply }).await
    }

    /// Tears the session down.
    ///
    /// Returns once the session has released whatever it holds. If an
    /// acquisition is still in flight, the session finishes in the
    /// background and releases the camera as soon as it resolves.
    pub async fn unmount(self) -> ScanResult<()> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Unmount(tx)).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<ScanResult<T>>) -> Command,
    ) -> ScanResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ScanError::SessionClosed)?;
        rx.await.map_err(|_| ScanError::SessionClosed)?
    }
}

// =============================================================================
// Session Actor
// =============================================================================

type AcquireTask<C> = JoinHandle<(C, ScanResult<()>)>;
type DecodeTask<C> = JoinHandle<(C, ScanResult<String>)>;

struct PendingDecode<C> {
    task: DecodeTask<C>,
    reply: oneshot::Sender<ScanResult<ParsedRecord>>,
}

/// The scan session actor.
///
/// ## Usage
/// ```rust,ignore
/// let session = ScanSession::mount(LineScannerProvider, ScanConfig::default(), "-");
///
/// let state = session.wait_until(|s| matches!(s, ScanState::Matched(_))).await?;
/// session.unmount().await?;
/// ```
pub struct ScanSession<P: CameraProvider> {
    id: Uuid,
    provider: P,
    target: String,
    config: ScanConfig,

    state: watch::Sender<ScanState>,
    notices: broadcast::Sender<ScanNotice>,
    commands: mpsc::Receiver<Command>,

    /// Created on first use and reused; `None` while lent to a task.
    camera: Option<P::Camera>,
    events: Option<mpsc::Receiver<DecodeEvent>>,
    acquiring: Option<AcquireTask<P::Camera>>,
    /// Receiver for the acquisition in flight; becomes `events` on success.
    pending_events: Option<mpsc::Receiver<DecodeEvent>>,
    decoding: Option<PendingDecode<P::Camera>>,

    /// When set, the camera starts at this instant.
    start_at: Option<Instant>,
    stop_requested: bool,
    mounted: bool,
}

impl<P: CameraProvider> ScanSession<P> {
    /// Mounts a session on `target` and, unless `auto_start` is off,
    /// schedules the first start after the settle delay.
    pub fn mount(provider: P, config: ScanConfig, target: impl Into<String>) -> ScanSessionHandle {
        let id = Uuid::new_v4();
        let start_at = config
            .auto_start
            .then(|| Instant::now() + config.settle_delay);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ScanState::Idle);
        let (notice_tx, _) = broadcast::channel(NOTICE_BUFFER);

        let session = ScanSession {
            id,
            provider,
            target: target.into(),
            start_at,
            config,
            state: state_tx,
            notices: notice_tx.clone(),
            commands: command_rx,
            camera: None,
            events: None,
            acquiring: None,
            pending_events: None,
            decoding: None,
            stop_requested: false,
            mounted: true,
        };

        tokio::spawn(session.run());

        ScanSessionHandle {
            id,
            commands: command_tx,
            state: state_rx,
            notices: notice_tx,
        }
    }

    /// Main actor loop.
    async fn run(mut self) {
        info!(session = %self.id, target = %self.target, "Scan session mounted");

        while self.mounted || self.acquiring.is_some() || self.decoding.is_some() {
            tokio::select! {
                command = self.commands.recv(), if self.mounted => match command {
                    Some(command) => self.handle(command).await,
                    None => self.teardown().await,
                },

                event = next_event(&mut self.events) => self.on_event(event).await,

                joined = join_task(&mut self.acquiring) => {
                    self.acquiring = None;
                    self.on_acquired(joined).await;
                }

                joined = join_decode(&mut self.decoding) => {
                    if let Some(pending) = self.decoding.take() {
                        self.on_decoded(joined, pending.reply).await;
                    }
                }

                _ = until_deadline(self.start_at) => {
                    self.start_at = None;
                    if let Err(e) = self.begin_start().await {
                        debug!(session = %self.id, error = %e, "Scheduled start skipped");
                    }
                }
            }
        }

        self.release().await;
        info!(session = %self.id, "Scan session unmounted");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = self.begin_start().await;
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                self.stop().await;
                let _ = reply.send(Ok(()));
            }
            Command::ScanNext(reply) => {
                let _ = reply.send(self.scan_next());
            }
            Command::ScanFile { image, reply } => self.begin_decode(image, reply).await,
            Command::Unmount(reply) => {
                self.teardown().await;
                let _ = reply.send(());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Idle/Error → Starting. Already starting or scanning is a no-op.
    async fn begin_start(&mut self) -> ScanResult<()> {
        self.start_at = None;

        match self.current() {
            ScanState::Starting => {
                // A start after a deferred stop keeps the acquisition
                self.stop_requested = false;
                return Ok(());
            }
            ScanState::Scanning => return Ok(()),
            ScanState::Matched(_) => {
                return Err(ScanError::SessionBusy(
                    "a label is matched; scan next first".to_string(),
                ))
            }
            ScanState::Idle | ScanState::Error(_) => {}
        }
        if self.decoding.is_some() {
            return Err(ScanError::SessionBusy("decoding an image".to_string()));
        }

        self.stop_requested = false;
        self.set_state(ScanState::Starting);

        let mut camera = match self.take_camera() {
            Ok(camera) => camera,
            Err(e) => {
                self.fail(&e).await;
                return Err(e);
            }
        };

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let settings = self.config.camera.clone();
        let task = tokio::spawn(async move {
            let result = camera.start(&settings, event_tx).await;
            (camera, result)
        });

        self.acquiring = Some(task);
        self.pending_events = Some(event_rx);
        Ok(())
    }

    /// Starting → Scanning | Error, or straight to release when the session
    /// was stopped or unmounted meanwhile.
    async fn on_acquired(&mut self, joined: Result<(P::Camera, ScanResult<()>), JoinError>) {
        let events = self.pending_events.take();
        let (camera, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!(session = %self.id, error = %e, "Camera acquisition task failed");
                let err = ScanError::Internal(e.to_string());
                if self.mounted {
                    self.fail(&err).await;
                }
                return;
            }
        };
        self.camera = Some(camera);

        if !self.mounted || self.stop_requested {
            debug!(session = %self.id, "Acquisition resolved after stop; releasing");
            self.stop_requested = false;
            self.release().await;
            if self.mounted {
                self.set_state(ScanState::Idle);
            }
            return;
        }

        match result {
            Ok(()) => {
                self.events = events;
                self.set_state(ScanState::Scanning);
            }
            Err(e) => self.fail(&e).await,
        }
    }

    /// Scanning → Matched on the first valid label; notices otherwise.
    async fn on_event(&mut self, event: Option<DecodeEvent>) {
        let text = match event {
            Some(DecodeEvent::Decoded(text)) => text,
            Some(DecodeEvent::Miss) => return,
            None => {
                warn!(session = %self.id, "Decode stream ended while scanning");
                let err = ScanError::DeviceUnavailable("scanner stream ended".to_string());
                self.fail(&err).await;
                return;
            }
        };

        match label::decode(&text) {
            Ok(record) => {
                // Unsubscribe before anything else: later callbacks are moot
                self.events = None;
                info!(session = %self.id, id = %record.id, "Label matched");
                self.release().await;
                self.matched(record);
            }
            Err(e) => {
                debug!(session = %self.id, error = %e, "Scanned text rejected");
                self.notify(NoticeKind::Rejected, e.to_string());
            }
        }
    }

    /// Scanning → Idle. During `Starting` the release is deferred.
    async fn stop(&mut self) {
        self.start_at = None;

        match self.current() {
            ScanState::Starting => self.stop_requested = true,
            ScanState::Scanning => {
                self.release().await;
                self.set_state(ScanState::Idle);
            }
            _ => {}
        }
    }

    /// Matched/Idle/Error → Idle, start after the settle delay.
    fn scan_next(&mut self) -> ScanResult<()> {
        match self.current() {
            ScanState::Starting | ScanState::Scanning => Ok(()),
            _ if self.decoding.is_some() => {
                Err(ScanError::SessionBusy("decoding an image".to_string()))
            }
            _ => {
                self.set_state(ScanState::Idle);
                self.start_at = Some(Instant::now() + self.config.settle_delay);
                Ok(())
            }
        }
    }

    /// File upload: stop live camera, then one decode attempt off-actor.
    async fn begin_decode(
        &mut self,
        image: Vec<u8>,
        reply: oneshot::Sender<ScanResult<ParsedRecord>>,
    ) {
        let busy = if matches!(self.current(), ScanState::Starting) {
            Some("camera is starting")
        } else if self.decoding.is_some() {
            Some("decoding an image")
        } else {
            None
        };
        if let Some(reason) = busy {
            let _ = reply.send(Err(ScanError::SessionBusy(reason.to_string())));
            return;
        }

        self.start_at = None;
        if matches!(self.current(), ScanState::Scanning) {
            self.release().await;
        }
        self.set_state(ScanState::Idle);

        let mut camera = match self.take_camera() {
            Ok(camera) => camera,
            Err(e) => {
                self.notify(NoticeKind::Rejected, e.upload_notice());
                let _ = reply.send(Err(e));
                return;
            }
        };

        let task = tokio::spawn(async move {
            let result = camera.decode_file(image).await;
            (camera, result)
        });
        self.decoding = Some(PendingDecode { task, reply });
    }

    /// Decoded file → Matched, or Idle with a notice.
    async fn on_decoded(
        &mut self,
        joined: Result<(P::Camera, ScanResult<String>), JoinError>,
        reply: oneshot::Sender<ScanResult<ParsedRecord>>,
    ) {
        let outcome = match joined {
            Ok((camera, result)) => {
                self.camera = Some(camera);
                result.and_then(|text| label::decode(&text).map_err(ScanError::from))
            }
            Err(e) => {
                error!(session = %self.id, error = %e, "Image decode task failed");
                Err(ScanError::Internal(e.to_string()))
            }
        };

        if !self.mounted {
            let _ = reply.send(outcome);
            return;
        }

        match &outcome {
            Ok(record) => {
                info!(session = %self.id, id = %record.id, "Label matched from image");
                self.matched(record.clone());
            }
            Err(e) => {
                debug!(session = %self.id, error = %e, "Image rejected");
                self.notify(NoticeKind::Rejected, e.upload_notice());
                self.set_state(ScanState::Idle);
            }
        }
        let _ = reply.send(outcome);
    }

    /// Any state → released, no longer accepting commands.
    async fn teardown(&mut self) {
        self.mounted = false;
        self.start_at = None;
        self.events = None;
        self.release().await;
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn take_camera(&mut self) -> ScanResult<P::Camera> {
        match self.camera.take() {
            Some(camera) => Ok(camera),
            None => {
                debug!(session = %self.id, target = %self.target, "Opening camera");
                self.provider.open(&self.target)
            }
        }
    }

    /// Stops and clears the camera if the actor holds it. Failures are
    /// logged and swallowed.
    async fn release(&mut self) {
        self.events = None;

        let Some(camera) = self.camera.as_mut() else {
            return;
        };

        if camera.is_scanning() {
            if let Err(e) = camera.stop().await {
                warn!(session = %self.id, error = %e, "Camera stop failed");
            }
        }
        if let Err(e) = camera.clear() {
            warn!(session = %self.id, error = %e, "Camera clear failed");
        }
    }

    async fn fail(&mut self, err: &ScanError) {
        warn!(session = %self.id, error = %err, "Scan session error");
        self.release().await;
        self.notify(NoticeKind::DeviceError, err.to_string());
        self.set_state(ScanState::Error(err.to_string()));
    }

    fn matched(&mut self, record: ParsedRecord) {
        self.notify(NoticeKind::Matched, MATCHED_NOTICE);
        self.set_state(ScanState::Matched(record));
    }

    fn current(&self) -> ScanState {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: ScanState) {
        let to = next.name();
        let previous = self.state.send_replace(next);
        debug!(session = %self.id, from = previous.name(), to, "State transition");
    }

    fn notify(&self, kind: NoticeKind, message: impl Into<String>) {
        // No subscribers is fine
        let _ = self.notices.send(ScanNotice::new(kind, message));
    }
}

// =============================================================================
// Select Helpers
// =============================================================================

async fn next_event(events: &mut Option<mpsc::Receiver<DecodeEvent>>) -> Option<DecodeEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// Each borrows in place: a branch that loses the race must leave its task
// where it was.

async fn join_task<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

async fn join_decode<C>(
    decoding: &mut Option<PendingDecode<C>>,
) -> Result<(C, ScanResult<String>), JoinError> {
    match decoding {
        Some(pending) => (&mut pending.task).await,
        None => std::future::pending().await,
    }
}

async fn until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
