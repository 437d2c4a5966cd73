// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera session lifecycle: acquiring a live stream from the platform bridge
// and releasing its hardware tracks exactly once.

use std::sync::Arc;

use belegwerk_bridge::{PlatformBridge, StreamRequest, VideoSource};
use belegwerk_core::config::CameraRequest;
use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::{FacingPreference, Resolution, SessionId};
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

/// An open camera stream.
///
/// Exclusively owned by whoever opened it. Closing is idempotent, and a
/// session that goes out of scope closes itself, so the camera is released
/// on every exit path.
pub struct CameraSession {
    id: SessionId,
    facing: FacingPreference,
    requested: Resolution,
    source: Box<dyn VideoSource>,
    closed: bool,
}

impl CameraSession {
    fn new(request: &StreamRequest, source: Box<dyn VideoSource>) -> Self {
        Self {
            id: SessionId::new(),
            facing: request.facing,
            requested: request.ideal,
            source,
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn facing(&self) -> FacingPreference {
        self.facing
    }

    /// The resolution asked for when the session was opened.
    pub fn requested_resolution(&self) -> Resolution {
        self.requested
    }

    /// The resolution the device is actually delivering.
    pub fn resolution(&self) -> Resolution {
        self.source.resolution()
    }

    pub fn is_active(&self) -> bool {
        !self.closed && self.source.is_active()
    }

    /// The newest live frame, or `None` before the device has produced one.
    pub fn current_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        if self.closed {
            return Err(BelegwerkError::SessionInactive);
        }
        self.source.latest_frame()
    }

    /// Stop all hardware tracks. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            debug!(session = %self.id, "Camera session already closed");
            return;
        }
        self.source.stop();
        self.closed = true;
        info!(session = %self.id, "Camera session closed");
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(session = %self.id, "Camera session dropped while open; releasing");
            self.close();
        }
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.id)
            .field("facing", &self.facing)
            .field("requested", &self.requested)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Opens and closes [`CameraSession`]s on a platform camera.
pub struct CameraSessionManager {
    camera: Box<dyn PlatformBridge>,
    request: CameraRequest,
}

impl CameraSessionManager {
    pub fn new(camera: Box<dyn PlatformBridge>, request: CameraRequest) -> Self {
        Self { camera, request }
    }

    /// Name of the platform camera in use.
    pub fn platform_name(&self) -> &str {
        self.camera.platform_name()
    }

    /// Request a live stream facing `preference` at the configured ideal
    /// resolution.
    ///
    /// Fails with `CameraUnavailable` when permission is refused or no
    /// device exists.
    #[instrument(skip(self), fields(platform = %self.camera.platform_name()))]
    pub fn open(&self, preference: FacingPreference) -> Result<CameraSession> {
        let request = StreamRequest {
            facing: preference,
            ideal: self.request.ideal_resolution,
        };
        let source = self.camera.open_stream(&request).map_err(|err| match err {
            unavailable @ BelegwerkError::CameraUnavailable(_) => unavailable,
            other => BelegwerkError::CameraUnavailable(other.to_string()),
        })?;
        let session = CameraSession::new(&request, source);
        info!(
            session = %session.id(),
            facing = preference.facing_mode(),
            requested = %request.ideal,
            actual = %session.resolution(),
            "Camera session opened"
        );
        Ok(session)
    }

    /// Open a stream with the configured facing preference.
    pub fn open_default(&self) -> Result<CameraSession> {
        self.open(self.request.facing)
    }

    /// Release the session's hardware tracks. Idempotent.
    pub fn close(&self, session: &mut CameraSession) {
        session.close();
    }
}

impl std::fmt::Debug for CameraSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSessionManager")
            .field("platform", &self.camera.platform_name())
            .field("request", &self.request)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use belegwerk_bridge::SyntheticCamera;
    use belegwerk_bridge::stub::StubBridge;
    use belegwerk_bridge::synthetic::blank_frame;

    fn manager(camera: &SyntheticCamera) -> CameraSessionManager {
        CameraSessionManager::new(Box::new(camera.clone()), CameraRequest::default())
    }

    #[test]
    fn open_reports_actual_resolution() {
        let camera = SyntheticCamera::new(blank_frame(640, 480));
        let session = manager(&camera).open_default().expect("open");
        assert!(session.is_active());
        assert_eq!(session.requested_resolution(), Resolution::FULL_HD);
        assert_eq!(session.resolution(), Resolution::new(640, 480));
        assert_eq!(session.facing(), FacingPreference::Environment);
    }

    #[test]
    fn close_is_idempotent() {
        let camera = SyntheticCamera::new(blank_frame(8, 8));
        let manager = manager(&camera);
        let mut session = manager.open(FacingPreference::User).expect("open");
        manager.close(&mut session);
        manager.close(&mut session);
        drop(session);
        assert_eq!(camera.stats().stops(), 1);
    }

    #[test]
    fn closed_session_has_no_frames() {
        let camera = SyntheticCamera::new(blank_frame(8, 8));
        let mut session = manager(&camera).open_default().expect("open");
        assert!(session.current_frame().expect("frame").is_some());
        session.close();
        assert!(!session.is_active());
        assert!(matches!(
            session.current_frame(),
            Err(BelegwerkError::SessionInactive)
        ));
    }

    #[test]
    fn dropping_releases_the_camera() {
        let camera = SyntheticCamera::new(blank_frame(8, 8));
        {
            let _session = manager(&camera).open_default().expect("open");
        }
        assert_eq!(camera.stats().opens(), 1);
        assert_eq!(camera.stats().stops(), 1);
    }

    #[test]
    fn missing_camera_is_unavailable() {
        let manager = CameraSessionManager::new(Box::new(StubBridge), CameraRequest::default());
        assert!(matches!(
            manager.open_default(),
            Err(BelegwerkError::CameraUnavailable(_))
        ));
    }
}
