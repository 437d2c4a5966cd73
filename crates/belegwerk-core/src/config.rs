// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture configuration: camera request, detection thresholds, and encoder
// settings.

use serde::{Deserialize, Serialize};

use crate::error::{BelegwerkError, Result};
use crate::types::{FacingPreference, OutputFormat, OutputSize, Resolution};

/// Largest output edge accepted, in pixels.
pub const MAX_OUTPUT_EDGE: u32 = 10_000;

/// Persistent capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera: CameraRequest,
    pub detection: DetectionConfig,
    pub encoding: EncodingConfig,
}

/// What the workflow asks the device camera for. Advisory only: the device
/// may deliver a different resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRequest {
    pub facing: FacingPreference,
    pub ideal_resolution: Resolution,
}

/// Document boundary detection and rectification parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum quadrilateral area as a fraction of the frame area.
    pub min_area_fraction: f32,
    /// Gaussian blur sigma applied before edge detection.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon: f64,
    /// Frames are downscaled so their longer side is at most this many
    /// pixels before analysis. Rectification always samples the full frame.
    pub analysis_max_edge: u32,
    /// Size of the rectified raster.
    pub output_size: OutputSize,
}

/// Output encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub format: OutputFormat,
    /// Lossy quality, 1-100. Ignored for lossless formats.
    pub quality: u8,
}

impl Default for CameraRequest {
    fn default() -> Self {
        Self {
            facing: FacingPreference::Environment,
            ideal_resolution: Resolution::FULL_HD,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.20,
            blur_sigma: 1.5,
            canny_low: 40.0,
            canny_high: 120.0,
            polygon_epsilon: 0.02,
            analysis_max_edge: 800,
            output_size: OutputSize::FitLongEdge(1600),
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 80,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera: CameraRequest::default(),
            detection: DetectionConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl CaptureConfig {
    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let res = self.camera.ideal_resolution;
        if res.width == 0 || res.height == 0 {
            return Err(BelegwerkError::InvalidConfig(format!(
                "ideal resolution must be non-zero, got {res}"
            )));
        }
        self.detection.validate()?;
        if !(1..=100).contains(&self.encoding.quality) {
            return Err(BelegwerkError::InvalidConfig(format!(
                "encoding quality must be 1-100, got {}",
                self.encoding.quality
            )));
        }
        Ok(())
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_area_fraction > 0.0 && self.min_area_fraction < 1.0) {
            return Err(BelegwerkError::InvalidConfig(format!(
                "min_area_fraction must be in (0, 1), got {}",
                self.min_area_fraction
            )));
        }
        if self.blur_sigma <= 0.0 {
            return Err(BelegwerkError::InvalidConfig(
                "blur_sigma must be positive".into(),
            ));
        }
        if self.canny_low <= 0.0 || self.canny_high < self.canny_low {
            return Err(BelegwerkError::InvalidConfig(format!(
                "canny thresholds must satisfy 0 < low <= high, got {}/{}",
                self.canny_low, self.canny_high
            )));
        }
        if !(self.polygon_epsilon > 0.0 && self.polygon_epsilon < 0.5) {
            return Err(BelegwerkError::InvalidConfig(format!(
                "polygon_epsilon must be in (0, 0.5), got {}",
                self.polygon_epsilon
            )));
        }
        if self.analysis_max_edge < 64 {
            return Err(BelegwerkError::InvalidConfig(
                "analysis_max_edge must be at least 64".into(),
            ));
        }
        match self.output_size {
            OutputSize::FitLongEdge(0) => Err(BelegwerkError::InvalidConfig(
                "output long edge must be non-zero".into(),
            )),
            OutputSize::FitLongEdge(edge) if edge > MAX_OUTPUT_EDGE => {
                Err(BelegwerkError::InvalidConfig(format!(
                    "output long edge must be at most {MAX_OUTPUT_EDGE}, got {edge}"
                )))
            }
            OutputSize::Exact { width, height } if width == 0 || height == 0 => Err(
                BelegwerkError::InvalidConfig("exact output size must be non-zero".into()),
            ),
            OutputSize::Exact { width, height }
                if width > MAX_OUTPUT_EDGE || height > MAX_OUTPUT_EDGE =>
            {
                Err(BelegwerkError::InvalidConfig(format!(
                    "exact output size must be at most {MAX_OUTPUT_EDGE} per side, got {width}x{height}"
                )))
            }
            _ => Ok(()),
        }
    }
}
