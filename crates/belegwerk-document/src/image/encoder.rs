// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output encoding: compresses a reviewed raster into the Blob handed to the
// caller.

use std::io::Cursor;

use belegwerk_core::config::EncodingConfig;
use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::{Blob, OutputFormat};
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::raster::RasterBuffer;
use crate::scan::CaptureResult;

/// Compress `raster` into `format`.
///
/// `quality` (1-100) applies to JPEG only. Alpha is dropped for JPEG. The
/// same raster and settings always produce the same bytes.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn encode(raster: &RasterBuffer, format: OutputFormat, quality: u8) -> Result<Blob> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(BelegwerkError::EncodingFailed(
            "cannot encode an empty raster".into(),
        ));
    }

    let bytes = match format {
        OutputFormat::Jpeg => encode_jpeg(raster, quality.clamp(1, 100))?,
        OutputFormat::Png => encode_png(raster)?,
    };
    let sha256 = hash_bytes(&bytes);

    info!(
        size = bytes.len(),
        mime = format.mime_type(),
        sha256 = %sha256,
        "Raster encoded"
    );

    Ok(Blob {
        bytes,
        format,
        width: raster.width(),
        height: raster.height(),
        rectified: false,
        sha256,
        encoded_at: Utc::now(),
    })
}

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn encode_jpeg(raster: &RasterBuffer, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = raster.to_dynamic().to_rgb8();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| BelegwerkError::EncodingFailed(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

fn encode_png(raster: &RasterBuffer) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    raster
        .as_image()
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| BelegwerkError::EncodingFailed(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Encoding settings bound to a capture workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEncoder {
    pub format: OutputFormat,
    pub quality: u8,
}

impl OutputEncoder {
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self { format, quality }
    }

    pub fn from_config(config: &EncodingConfig) -> Self {
        Self::new(config.format, config.quality)
    }

    pub fn encode(&self, raster: &RasterBuffer) -> Result<Blob> {
        encode(raster, self.format, self.quality)
    }

    /// Encode the raster of a capture result, recording whether it was
    /// rectified.
    pub fn encode_result(&self, result: &CaptureResult) -> Result<Blob> {
        let mut blob = self.encode(result.raster())?;
        blob.rectified = result.is_detected();
        Ok(blob)
    }
}

impl Default for OutputEncoder {
    fn default() -> Self {
        Self::from_config(&EncodingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> RasterBuffer {
        RasterBuffer::new(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128, 255])
        }))
    }

    #[test]
    fn jpeg_is_deterministic() {
        let raster = gradient(64, 48);
        let a = encode(&raster, OutputFormat::Jpeg, 80).expect("encode");
        let b = encode(&raster, OutputFormat::Jpeg, 80).expect("encode");
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.mime_type(), "image/jpeg");
        assert_eq!(&a.bytes[..3], &[0xFF, 0xD8, 0xFF]);
        assert_eq!((a.width, a.height), (64, 48));
    }

    #[test]
    fn png_round_trips_pixels() {
        let raster = gradient(20, 10);
        let blob = encode(&raster, OutputFormat::Png, 80).expect("encode");
        assert_eq!(blob.mime_type(), "image/png");
        let decoded = image::load_from_memory(&blob.bytes).expect("decode").into_rgba8();
        assert_eq!(&decoded, raster.as_image());
    }

    #[test]
    fn quality_changes_size() {
        let raster = gradient(128, 128);
        let low = encode(&raster, OutputFormat::Jpeg, 10).expect("encode");
        let high = encode(&raster, OutputFormat::Jpeg, 95).expect("encode");
        assert!(low.len() < high.len());
    }

    #[test]
    fn empty_raster_fails() {
        let raster = RasterBuffer::new(RgbaImage::new(0, 0));
        assert!(matches!(
            encode(&raster, OutputFormat::Jpeg, 80),
            Err(BelegwerkError::EncodingFailed(_))
        ));
    }

    #[test]
    fn fallback_results_are_not_marked_rectified() {
        let result = CaptureResult::FallbackRaw(gradient(8, 8));
        let blob = OutputEncoder::default().encode_result(&result).expect("encode");
        assert!(!blob.rectified);
        assert_eq!(blob.sha256, hash_bytes(&blob.bytes));
        assert_eq!(blob.sha256.len(), 64);
    }
}
