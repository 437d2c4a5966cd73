// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Still-image camera: serves one decoded photo as a never-changing live
// stream. Used on desktop, where documents usually arrive as image files
// rather than through a phone camera.

use std::sync::Arc;

use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::Resolution;
use image::RgbaImage;
use tracing::{debug, info, instrument};

use crate::traits::*;

/// A camera whose every frame is the same still image.
pub struct StillImageCamera {
    frame: Arc<RgbaImage>,
}

impl StillImageCamera {
    /// Load the still frame from an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|err| {
            BelegwerkError::CameraUnavailable(format!(
                "failed to open still image {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = image.width(),
            height = image.height(),
            "Still image loaded"
        );
        Ok(Self::from_image(image.to_rgba8()))
    }

    /// Decode the still frame from encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            BelegwerkError::CameraUnavailable(format!("failed to decode still image: {}", err))
        })?;
        Ok(Self::from_image(image.to_rgba8()))
    }

    /// Wrap an already-decoded frame.
    pub fn from_image(frame: RgbaImage) -> Self {
        Self {
            frame: Arc::new(frame),
        }
    }
}

impl PlatformBridge for StillImageCamera {
    fn platform_name(&self) -> &str {
        "Desktop (still image)"
    }
}

impl NativeCamera for StillImageCamera {
    fn open_stream(&self, request: &StreamRequest) -> Result<Box<dyn VideoSource>> {
        if self.frame.width() == 0 || self.frame.height() == 0 {
            return Err(BelegwerkError::CameraUnavailable(
                "still image has no pixels".into(),
            ));
        }
        let resolution = Resolution::new(self.frame.width(), self.frame.height());
        debug!(
            requested = %request.ideal,
            delivered = %resolution,
            "Still image stream opened"
        );
        Ok(Box::new(StillImageSource {
            frame: Arc::clone(&self.frame),
            resolution,
            active: true,
        }))
    }
}

struct StillImageSource {
    frame: Arc<RgbaImage>,
    resolution: Resolution,
    active: bool,
}

impl VideoSource for StillImageSource {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn latest_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        if !self.active {
            return Err(BelegwerkError::SessionInactive);
        }
        Ok(Some(Arc::clone(&self.frame)))
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        self.active = false;
    }
}
