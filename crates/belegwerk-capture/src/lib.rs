// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// belegwerk-capture: the capture workflow.
//
// Owns the camera session lifecycle, grabs still frames from the live
// stream, and drives the Idle -> Previewing -> Processing -> Reviewing ->
// Emitted/Cancelled state machine that turns a confirmed frame into an
// encoded document.

pub mod frame;
pub mod machine;
pub mod session;
pub mod workflow;

pub use frame::FrameCapturer;
pub use machine::{
    CaptureEvent, CaptureState, CaptureStateMachine, Previewing, Processing, Reviewing,
    StateKind, Transition,
};
pub use session::{CameraSession, CameraSessionManager};
pub use workflow::CaptureWorkflow;
