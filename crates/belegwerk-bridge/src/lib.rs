// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Belegwerk: Camera bridge abstractions.
//
// Defines the traits the capture workflow uses to reach a camera, plus the
// implementations available without native mobile SDKs: a webcam bridge
// (feature `webcam`), a still-image camera for desktop use, a synthetic
// camera for tests, and a stub for platforms with no camera at all.

pub mod still;
pub mod stub;
pub mod synthetic;
pub mod traits;

#[cfg(feature = "webcam")]
pub mod webcam;

pub use still::StillImageCamera;
pub use synthetic::SyntheticCamera;
pub use traits::{NativeCamera, PlatformBridge, StreamRequest, VideoSource};

/// Returns the camera bridge for this build.
///
/// With the `webcam` feature the first system camera is used; otherwise the
/// stub bridge reports every open as `CameraUnavailable`.
pub fn platform_bridge() -> Box<dyn PlatformBridge> {
    #[cfg(feature = "webcam")]
    {
        Box::new(webcam::WebcamBridge::default())
    }
    #[cfg(not(feature = "webcam"))]
    {
        Box::new(stub::StubBridge)
    }
}
