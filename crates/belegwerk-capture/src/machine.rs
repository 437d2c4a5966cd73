// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture state machine.
//
//   Idle --open--> Previewing --capture--> Processing --complete--> Reviewing
//                      ^                                               |
//                      +-------------------- retry --------------------+
//   Reviewing --confirm--> Emitted
//   any non-terminal --cancel--> Cancelled
//
// Each live state is a typestate handle whose consuming methods are the only
// legal transitions out of it. `CaptureStateMachine` wraps those handles in
// an event-driven driver for hosts that dispatch user input one event at a
// time; events a state does not accept are reported as ignored.

use std::fmt;
use std::mem;
use std::sync::Arc;

use belegwerk_bridge::PlatformBridge;
use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::human_errors::{HumanError, detection_notice};
use belegwerk_core::{Blob, CaptureConfig, SessionId};
use belegwerk_document::{
    CaptureResult, ContourExtractor, OutputEncoder, QuadExtractor, RasterBuffer,
};
use image::RgbaImage;
use tracing::{info, instrument, warn};

use crate::frame::FrameCapturer;
use crate::session::{CameraSession, CameraSessionManager};

// -- Typestate handles --------------------------------------------------------

/// A live camera preview, ready to capture.
#[derive(Debug)]
pub struct Previewing {
    session: CameraSession,
}

impl Previewing {
    /// Open a camera session and start previewing.
    pub fn open(sessions: &CameraSessionManager) -> Result<Self> {
        Ok(Self {
            session: sessions.open_default()?,
        })
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// The newest live frame.
    pub fn preview_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        self.session.current_frame()
    }

    /// Grab the current frame. On failure the preview is handed back
    /// untouched alongside the error.
    pub fn capture(
        mut self,
        capturer: &FrameCapturer,
    ) -> std::result::Result<Processing, (Previewing, BelegwerkError)> {
        match capturer.capture(&mut self.session) {
            Ok(raw) => Ok(Processing {
                session: self.session,
                raw,
            }),
            Err(err) => Err((self, err)),
        }
    }

    /// Stop the preview and release the camera.
    pub fn cancel(mut self) {
        self.session.close();
    }
}

/// A captured frame waiting for extraction. Offers no user exit other than
/// cancel.
#[derive(Debug)]
pub struct Processing {
    session: CameraSession,
    raw: RasterBuffer,
}

impl Processing {
    /// The frame being processed.
    pub fn raw(&self) -> &RasterBuffer {
        &self.raw
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// Run extraction and move on to review. Extraction cannot fail.
    pub fn complete(self, extractor: &dyn QuadExtractor) -> Reviewing {
        let result = extractor.extract(&self.raw);
        Reviewing {
            session: self.session,
            result,
        }
    }

    pub fn cancel(mut self) {
        self.session.close();
    }
}

/// An extraction result shown to the user for confirmation.
#[derive(Debug)]
pub struct Reviewing {
    session: CameraSession,
    result: CaptureResult,
}

impl Reviewing {
    pub fn result(&self) -> &CaptureResult {
        &self.result
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// The live frame behind the review screen.
    pub fn preview_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        self.session.current_frame()
    }

    /// Informational notice for the review screen when no document was found.
    pub fn notice(&self) -> Option<HumanError> {
        (!self.result.is_detected()).then(detection_notice)
    }

    /// Discard the result and return to the same live preview.
    pub fn retry(self) -> Previewing {
        Previewing {
            session: self.session,
        }
    }

    /// Encode the reviewed raster and release the camera.
    ///
    /// If encoding fails the review is handed back with the raster intact and
    /// the camera still open.
    pub fn confirm(
        mut self,
        encoder: &OutputEncoder,
    ) -> std::result::Result<Blob, (Reviewing, BelegwerkError)> {
        match encoder.encode_result(&self.result) {
            Ok(blob) => {
                self.session.close();
                Ok(blob)
            }
            Err(err) => Err((self, err)),
        }
    }

    pub fn cancel(mut self) {
        self.session.close();
    }
}

// -- Event-driven driver ------------------------------------------------------

/// User and pipeline events accepted by [`CaptureStateMachine::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Open,
    Capture,
    /// Extraction of the captured frame has finished.
    ProcessingComplete,
    Confirm,
    Retry,
    Cancel,
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Capture => "capture",
            Self::ProcessingComplete => "processing-complete",
            Self::Confirm => "confirm",
            Self::Retry => "retry",
            Self::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// Discriminant of [`CaptureState`], for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    Previewing,
    Processing,
    Reviewing,
    Emitted,
    Cancelled,
}

impl StateKind {
    /// `Emitted` and `Cancelled` accept no further events.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Emitted | Self::Cancelled)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Current state of a capture workflow. Idle holds no session; Emitted and
/// Cancelled have already released theirs.
#[derive(Debug)]
pub enum CaptureState {
    Idle,
    Previewing(Previewing),
    Processing(Processing),
    Reviewing(Reviewing),
    Emitted,
    Cancelled,
}

impl CaptureState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Previewing(_) => StateKind::Previewing,
            Self::Processing(_) => StateKind::Processing,
            Self::Reviewing(_) => StateKind::Reviewing,
            Self::Emitted => StateKind::Emitted,
            Self::Cancelled => StateKind::Cancelled,
        }
    }

    fn session(&self) -> Option<&CameraSession> {
        match self {
            Self::Previewing(p) => Some(p.session()),
            Self::Processing(p) => Some(p.session()),
            Self::Reviewing(r) => Some(r.session()),
            Self::Idle | Self::Emitted | Self::Cancelled => None,
        }
    }
}

/// What an event did to the machine.
#[derive(Debug)]
pub enum Transition {
    Moved { from: StateKind, to: StateKind },
    /// Confirmed and encoded; the machine is now `Emitted`.
    Emitted(Blob),
    /// The event is not accepted in the current state and changed nothing.
    Ignored { event: CaptureEvent, state: StateKind },
}

impl Transition {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Emitted(blob) => Some(blob),
            _ => None,
        }
    }
}

/// Drives one capture from camera open to an emitted document or a cancel.
pub struct CaptureStateMachine {
    state: CaptureState,
    sessions: CameraSessionManager,
    capturer: FrameCapturer,
    extractor: Box<dyn QuadExtractor>,
    encoder: OutputEncoder,
    /// Set once the camera has refused to open; later opens are ignored.
    camera_refused: bool,
}

impl CaptureStateMachine {
    /// A machine in `Idle` using `camera` with the given configuration.
    pub fn new(camera: Box<dyn PlatformBridge>, config: &CaptureConfig) -> Self {
        Self {
            state: CaptureState::Idle,
            sessions: CameraSessionManager::new(camera, config.camera),
            capturer: FrameCapturer,
            extractor: Box::new(ContourExtractor::new(config.detection)),
            encoder: OutputEncoder::from_config(&config.encoding),
            camera_refused: false,
        }
    }

    /// Replace the document extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn QuadExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_encoder(mut self, encoder: OutputEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    pub fn platform_name(&self) -> &str {
        self.sessions.platform_name()
    }

    /// Identity of the held camera session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session().map(CameraSession::id)
    }

    /// The frame being processed, while `Processing`.
    pub fn captured_raster(&self) -> Option<&RasterBuffer> {
        match &self.state {
            CaptureState::Processing(p) => Some(p.raw()),
            _ => None,
        }
    }

    /// The extraction result under review, while `Reviewing`.
    pub fn result(&self) -> Option<&CaptureResult> {
        match &self.state {
            CaptureState::Reviewing(r) => Some(r.result()),
            _ => None,
        }
    }

    /// Informational notice for the review screen, if any.
    pub fn notice(&self) -> Option<HumanError> {
        match &self.state {
            CaptureState::Reviewing(r) => r.notice(),
            _ => None,
        }
    }

    /// The live camera frame while previewing or reviewing; `None` in every
    /// other state.
    pub fn preview_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        match &mut self.state {
            CaptureState::Previewing(p) => p.preview_frame(),
            CaptureState::Reviewing(r) => r.preview_frame(),
            _ => Ok(None),
        }
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: CaptureEvent) -> Result<Transition> {
        match event {
            CaptureEvent::Open => self.open(),
            CaptureEvent::Capture => self.capture(),
            CaptureEvent::ProcessingComplete => Ok(self.finish_processing()),
            CaptureEvent::Confirm => self.confirm(),
            CaptureEvent::Retry => Ok(self.retry()),
            CaptureEvent::Cancel => Ok(self.cancel()),
        }
    }

    /// `Idle -> Previewing`. On `CameraUnavailable` the machine stays `Idle`
    /// and returns the error; the camera is not asked again, so any later
    /// `open` on this machine is ignored.
    #[instrument(skip(self))]
    pub fn open(&mut self) -> Result<Transition> {
        if self.camera_refused || !matches!(self.state, CaptureState::Idle) {
            return Ok(self.ignore(CaptureEvent::Open));
        }
        match Previewing::open(&self.sessions) {
            Ok(previewing) => {
                self.state = CaptureState::Previewing(previewing);
                Ok(self.moved(StateKind::Idle))
            }
            Err(err) => {
                warn!(error = %err, "Camera could not be opened");
                if err.is_fatal() {
                    self.camera_refused = true;
                }
                Err(err)
            }
        }
    }

    /// `Previewing -> Processing`.
    #[instrument(skip(self))]
    pub fn capture(&mut self) -> Result<Transition> {
        match mem::replace(&mut self.state, CaptureState::Cancelled) {
            CaptureState::Previewing(previewing) => match previewing.capture(&self.capturer) {
                Ok(processing) => {
                    self.state = CaptureState::Processing(processing);
                    Ok(self.moved(StateKind::Previewing))
                }
                Err((previewing, err)) => {
                    self.state = CaptureState::Previewing(previewing);
                    warn!(error = %err, "Frame capture failed; still previewing");
                    Err(err)
                }
            },
            other => {
                self.state = other;
                Ok(self.ignore(CaptureEvent::Capture))
            }
        }
    }

    /// `Processing -> Reviewing`: run extraction on the captured frame. A
    /// completion arriving in any other state (for example after a cancel)
    /// is discarded.
    #[instrument(skip(self))]
    pub fn finish_processing(&mut self) -> Transition {
        match mem::replace(&mut self.state, CaptureState::Cancelled) {
            CaptureState::Processing(processing) => {
                let reviewing = processing.complete(self.extractor.as_ref());
                if reviewing.result().is_detected() {
                    info!("Document detected and rectified");
                } else {
                    warn!("No document detected; reviewing the raw frame");
                }
                self.state = CaptureState::Reviewing(reviewing);
                self.moved(StateKind::Processing)
            }
            other => {
                self.state = other;
                self.ignore(CaptureEvent::ProcessingComplete)
            }
        }
    }

    /// Capture and run extraction in one step. Returns the final transition
    /// (into `Reviewing`), or `Ignored` if capture was not accepted.
    pub fn capture_and_process(&mut self) -> Result<Transition> {
        let transition = self.capture()?;
        if transition.is_ignored() {
            return Ok(transition);
        }
        Ok(self.finish_processing())
    }

    /// `Reviewing -> Emitted`. On `EncodingFailed` the machine stays in
    /// `Reviewing` with the result intact.
    #[instrument(skip(self))]
    pub fn confirm(&mut self) -> Result<Transition> {
        match mem::replace(&mut self.state, CaptureState::Cancelled) {
            CaptureState::Reviewing(reviewing) => match reviewing.confirm(&self.encoder) {
                Ok(blob) => {
                    self.state = CaptureState::Emitted;
                    info!(
                        size = blob.len(),
                        mime = blob.mime_type(),
                        rectified = blob.rectified,
                        "Capture emitted"
                    );
                    Ok(Transition::Emitted(blob))
                }
                Err((reviewing, err)) => {
                    self.state = CaptureState::Reviewing(reviewing);
                    warn!(error = %err, "Encoding failed; still reviewing");
                    Err(err)
                }
            },
            other => {
                self.state = other;
                Ok(self.ignore(CaptureEvent::Confirm))
            }
        }
    }

    /// `Reviewing -> Previewing` on the same session.
    #[instrument(skip(self))]
    pub fn retry(&mut self) -> Transition {
        match mem::replace(&mut self.state, CaptureState::Cancelled) {
            CaptureState::Reviewing(reviewing) => {
                self.state = CaptureState::Previewing(reviewing.retry());
                self.moved(StateKind::Reviewing)
            }
            other => {
                self.state = other;
                self.ignore(CaptureEvent::Retry)
            }
        }
    }

    /// Any non-terminal state `-> Cancelled`, releasing the camera if held.
    #[instrument(skip(self))]
    pub fn cancel(&mut self) -> Transition {
        let from = self.kind();
        if from.is_terminal() {
            return self.ignore(CaptureEvent::Cancel);
        }
        match mem::replace(&mut self.state, CaptureState::Cancelled) {
            CaptureState::Previewing(p) => p.cancel(),
            CaptureState::Processing(p) => p.cancel(),
            CaptureState::Reviewing(r) => r.cancel(),
            CaptureState::Idle | CaptureState::Emitted | CaptureState::Cancelled => {}
        }
        self.moved(from)
    }

    fn moved(&self, from: StateKind) -> Transition {
        let to = self.kind();
        info!(%from, %to, "Capture state changed");
        Transition::Moved { from, to }
    }

    fn ignore(&self, event: CaptureEvent) -> Transition {
        let state = self.kind();
        warn!(%event, %state, "Event ignored in current state");
        Transition::Ignored { event, state }
    }
}

impl fmt::Debug for CaptureStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureStateMachine")
            .field("state", &self.state)
            .field("sessions", &self.sessions)
            .field("encoder", &self.encoder)
            .field("camera_refused", &self.camera_refused)
            .finish_non_exhaustive()
    }
}
