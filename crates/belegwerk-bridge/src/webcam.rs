// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop webcam bridge via nokhwa.
//
// Desktop webcams rarely expose a facing direction, so the facing preference
// is logged and otherwise ignored; the configured device index is used.

use std::sync::Arc;

use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::Resolution;
use image::{DynamicImage, RgbaImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

use crate::traits::*;

/// Bridge that opens a system webcam by index.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebcamBridge {
    pub device_index: u32,
}

impl PlatformBridge for WebcamBridge {
    fn platform_name(&self) -> &str {
        "Desktop (webcam)"
    }
}

impl NativeCamera for WebcamBridge {
    fn open_stream(&self, request: &StreamRequest) -> Result<Box<dyn VideoSource>> {
        info!(
            index = self.device_index,
            facing = request.facing.facing_mode(),
            ideal = %request.ideal,
            "Opening webcam"
        );

        let closest = CameraFormat::new(
            nokhwa::utils::Resolution::new(request.ideal.width, request.ideal.height),
            FrameFormat::MJPEG,
            30,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(closest));

        let mut camera = Camera::new(CameraIndex::Index(self.device_index), requested)
            .map_err(|e| BelegwerkError::CameraUnavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| BelegwerkError::CameraUnavailable(e.to_string()))?;

        let delivered = camera.resolution();
        let resolution = Resolution::new(delivered.width(), delivered.height());
        if resolution != request.ideal {
            debug!(delivered = %resolution, "Webcam delivered a different resolution");
        }
        info!(resolution = %resolution, fps = camera.frame_rate(), "Webcam stream opened");

        Ok(Box::new(WebcamStream {
            camera,
            resolution,
            active: true,
        }))
    }
}

struct WebcamStream {
    camera: Camera,
    resolution: Resolution,
    active: bool,
}

impl VideoSource for WebcamStream {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn latest_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        if !self.active {
            return Err(BelegwerkError::SessionInactive);
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| BelegwerkError::Bridge(format!("webcam frame grab failed: {e}")))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| BelegwerkError::Bridge(format!("webcam frame decode failed: {e}")))?;

        let (width, height) = (decoded.width(), decoded.height());
        let rgb = image::RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            BelegwerkError::Bridge("webcam frame buffer has the wrong length".into())
        })?;

        Ok(Some(Arc::new(DynamicImage::ImageRgb8(rgb).to_rgba8())))
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = self.camera.stop_stream() {
            warn!(error = %e, "Webcam did not stop cleanly");
        }
        info!("Webcam stream stopped");
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        self.stop();
    }
}
