// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for camera access.

use std::sync::Arc;

use belegwerk_core::error::Result;
use belegwerk_core::{FacingPreference, Resolution};
use image::RgbaImage;

/// Stream constraints sent to the device. Advisory: implementations pick the
/// closest mode they support and report what they actually delivered via
/// [`VideoSource::resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: FacingPreference,
    pub ideal: Resolution,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: FacingPreference::Environment,
            ideal: Resolution::FULL_HD,
        }
    }
}

/// A live video stream. Frames are pulled, never buffered: each call to
/// [`latest_frame`](VideoSource::latest_frame) sees only the newest frame.
pub trait VideoSource {
    /// Resolution the device is actually delivering.
    fn resolution(&self) -> Resolution;

    /// The most recent frame, or `None` if the stream has not produced one
    /// yet.
    fn latest_frame(&mut self) -> Result<Option<Arc<RgbaImage>>>;

    /// Whether the underlying tracks are still running.
    fn is_active(&self) -> bool;

    /// Release all hardware tracks. Calling it twice must be harmless.
    fn stop(&mut self);
}

/// Acquire video streams from a device camera.
pub trait NativeCamera {
    /// Start a stream. Fails with `CameraUnavailable` when access is denied
    /// or no device exists.
    fn open_stream(&self, request: &StreamRequest) -> Result<Box<dyn VideoSource>>;
}

/// Unified bridge that groups the native capabilities the engine uses.
pub trait PlatformBridge: NativeCamera {
    /// Human-readable platform name (e.g. "Desktop (webcam)").
    fn platform_name(&self) -> &str;
}
