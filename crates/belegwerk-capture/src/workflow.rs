// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture workflow host: binds the caller's title and outcome callbacks to a
// state machine.

use std::sync::Arc;

use belegwerk_core::Blob;
use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::human_errors::{HumanError, humanize_error};
use belegwerk_document::CaptureResult;
use image::RgbaImage;
use tracing::{info, instrument, warn};

use crate::machine::{CaptureEvent, CaptureStateMachine, StateKind, Transition};

type CaptureCallback = Box<dyn FnOnce(Blob)>;
type CancelCallback = Box<dyn FnOnce()>;

/// One document capture, from camera open to a delivered payload or a
/// cancel.
///
/// Exactly one of `on_capture` and `on_cancel` is called per workflow:
/// `on_capture` with the encoded document when the user confirms, and
/// `on_cancel` when the user cancels, the camera cannot be opened, or the
/// workflow is dropped before finishing.
pub struct CaptureWorkflow {
    title: String,
    machine: CaptureStateMachine,
    on_capture: Option<CaptureCallback>,
    on_cancel: Option<CancelCallback>,
}

impl CaptureWorkflow {
    pub fn new(
        title: impl Into<String>,
        machine: CaptureStateMachine,
        on_capture: impl FnOnce(Blob) + 'static,
        on_cancel: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            machine,
            on_capture: Some(Box::new(on_capture)),
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Display title of the capture screen.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> StateKind {
        self.machine.kind()
    }

    pub fn machine(&self) -> &CaptureStateMachine {
        &self.machine
    }

    /// Whether an outcome callback has already fired.
    pub fn is_finished(&self) -> bool {
        self.on_capture.is_none() && self.on_cancel.is_none()
    }

    /// Open the camera. A camera that cannot be opened ends the workflow
    /// through `on_cancel`; the error is returned for the host to show.
    #[instrument(skip(self), fields(title = %self.title))]
    pub fn start(&mut self) -> Result<Transition> {
        match self.machine.open() {
            Ok(transition) => Ok(transition),
            Err(err) => {
                warn!(error = %err, "Camera unavailable; cancelling capture");
                self.machine.cancel();
                self.fire_cancel();
                Err(err)
            }
        }
    }

    /// Take a photo and run document extraction on it.
    pub fn capture(&mut self) -> Result<Transition> {
        self.machine.capture_and_process()
    }

    /// Back to the live preview with the same camera session.
    pub fn retry(&mut self) -> Transition {
        self.machine.retry()
    }

    /// Accept the reviewed result and deliver it through `on_capture`.
    ///
    /// An encoding failure leaves the workflow reviewing; nothing is
    /// delivered.
    pub fn confirm(&mut self) -> Result<Transition> {
        match self.machine.confirm()? {
            Transition::Emitted(blob) => {
                let summary = Transition::Moved {
                    from: StateKind::Reviewing,
                    to: StateKind::Emitted,
                };
                self.fire_capture(blob);
                Ok(summary)
            }
            other => Ok(other),
        }
    }

    /// Abandon the capture, releasing the camera and calling `on_cancel`.
    pub fn cancel(&mut self) -> Transition {
        let transition = self.machine.cancel();
        if !transition.is_ignored() {
            self.fire_cancel();
        }
        transition
    }

    /// Dispatch one event by name.
    pub fn handle(&mut self, event: CaptureEvent) -> Result<Transition> {
        match event {
            CaptureEvent::Open => self.start(),
            CaptureEvent::Capture => self.capture(),
            CaptureEvent::ProcessingComplete => Ok(self.machine.finish_processing()),
            CaptureEvent::Confirm => self.confirm(),
            CaptureEvent::Retry => Ok(self.retry()),
            CaptureEvent::Cancel => Ok(self.cancel()),
        }
    }

    /// The live camera frame while previewing or reviewing.
    pub fn preview_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        self.machine.preview_frame()
    }

    /// The extraction result under review.
    pub fn result(&self) -> Option<&CaptureResult> {
        self.machine.result()
    }

    /// Informational notice for the review screen (detection miss).
    pub fn notice(&self) -> Option<HumanError> {
        self.machine.notice()
    }

    /// Plain-language description of an error returned by this workflow.
    pub fn describe_error(err: &BelegwerkError) -> HumanError {
        humanize_error(err)
    }

    fn fire_capture(&mut self, blob: Blob) {
        self.on_cancel = None;
        if let Some(callback) = self.on_capture.take() {
            info!(title = %self.title, size = blob.len(), "Delivering captured document");
            callback(blob);
        }
    }

    fn fire_cancel(&mut self) {
        self.on_capture = None;
        if let Some(callback) = self.on_cancel.take() {
            info!(title = %self.title, "Capture cancelled");
            callback();
        }
    }
}

impl Drop for CaptureWorkflow {
    fn drop(&mut self) {
        if !self.is_finished() {
            warn!(title = %self.title, state = %self.machine.kind(), "Workflow dropped before finishing");
            self.machine.cancel();
            self.fire_cancel();
        }
    }
}

impl std::fmt::Debug for CaptureWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWorkflow")
            .field("title", &self.title)
            .field("machine", &self.machine)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use belegwerk_bridge::SyntheticCamera;
    use belegwerk_bridge::synthetic::blank_frame;
    use belegwerk_core::CaptureConfig;

    #[derive(Debug, Default, Clone)]
    struct Outcomes {
        captured: Rc<RefCell<Vec<Blob>>>,
        cancelled: Rc<RefCell<usize>>,
    }

    fn workflow(camera: &SyntheticCamera, outcomes: &Outcomes) -> CaptureWorkflow {
        let machine = CaptureStateMachine::new(Box::new(camera.clone()), &CaptureConfig::default());
        let captured = Rc::clone(&outcomes.captured);
        let cancelled = Rc::clone(&outcomes.cancelled);
        CaptureWorkflow::new(
            "Receipt",
            machine,
            move |blob| captured.borrow_mut().push(blob),
            move || *cancelled.borrow_mut() += 1,
        )
    }

    #[test]
    fn dropping_unfinished_workflow_cancels() {
        let camera = SyntheticCamera::new(blank_frame(32, 32));
        let outcomes = Outcomes::default();
        {
            let mut wf = workflow(&camera, &outcomes);
            wf.start().expect("open");
            assert_eq!(wf.title(), "Receipt");
        }
        assert_eq!(*outcomes.cancelled.borrow(), 1);
        assert!(outcomes.captured.borrow().is_empty());
        assert_eq!(camera.stats().stops(), 1);
    }

    #[test]
    fn second_cancel_does_not_fire_again() {
        let camera = SyntheticCamera::new(blank_frame(32, 32));
        let outcomes = Outcomes::default();
        let mut wf = workflow(&camera, &outcomes);
        wf.start().expect("open");
        assert!(!wf.cancel().is_ignored());
        assert!(wf.cancel().is_ignored());
        assert!(wf.is_finished());
        drop(wf);
        assert_eq!(*outcomes.cancelled.borrow(), 1);
    }

    #[test]
    fn events_after_delivery_change_nothing() {
        let camera = SyntheticCamera::new(blank_frame(32, 32));
        let outcomes = Outcomes::default();
        let mut wf = workflow(&camera, &outcomes);
        wf.start().expect("open");
        wf.capture().expect("capture");
        wf.confirm().expect("confirm");

        assert!(wf.cancel().is_ignored());
        assert!(wf.confirm().expect("confirm again").is_ignored());
        assert!(wf.capture().expect("capture again").is_ignored());
        drop(wf);

        assert_eq!(outcomes.captured.borrow().len(), 1);
        assert_eq!(*outcomes.cancelled.borrow(), 0);
    }
}
