// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Still-frame capture from a live session.

use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_document::RasterBuffer;
use tracing::{debug, instrument};

use crate::session::CameraSession;

/// Grabs the current live frame as an independent raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCapturer;

impl FrameCapturer {
    /// Copy the session's current frame at its native dimensions.
    ///
    /// The returned buffer owns its pixels; later frames from the stream do
    /// not affect it, and the session itself is left as it was. Fails with
    /// `SessionInactive` when the session is closed or has not delivered a
    /// frame yet.
    #[instrument(skip_all, fields(session = %session.id()))]
    pub fn capture(&self, session: &mut CameraSession) -> Result<RasterBuffer> {
        if !session.is_active() {
            return Err(BelegwerkError::SessionInactive);
        }
        let frame = session
            .current_frame()?
            .ok_or(BelegwerkError::SessionInactive)?;
        let raster = RasterBuffer::new(frame.as_ref().clone());
        debug!(
            width = raster.width(),
            height = raster.height(),
            "Frame captured"
        );
        Ok(raster)
    }
}
