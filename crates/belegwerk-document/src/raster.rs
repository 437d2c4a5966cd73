// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Immutable raster buffers shared between the capture pipeline stages.

use std::sync::Arc;

use belegwerk_core::Resolution;
use image::{DynamicImage, RgbaImage};

/// Pixel layout of a [`RasterBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    Rgba8,
}

/// An immutable in-memory pixel grid.
///
/// Cloning is cheap and shares the pixels: review screens, the encoder, and
/// logging can all hold the same buffer without locking. There is no way to
/// mutate a buffer once built; new pixels always mean a new buffer.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    pixels: Arc<RgbaImage>,
}

impl RasterBuffer {
    /// Take ownership of decoded RGBA pixels.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Convert any decoded image into an RGBA buffer.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.into_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    /// Borrow the pixels.
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether two handles point at the very same pixel storage.
    pub fn shares_pixels_with(&self, other: &RasterBuffer) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// Copy the pixels into a `DynamicImage` for encoding or further
    /// processing.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels.as_ref().clone())
    }
}

impl PartialEq for RasterBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.shares_pixels_with(other) || *self.pixels == *other.pixels
    }
}

impl Eq for RasterBuffer {}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn clones_share_pixels() {
        let raster = RasterBuffer::new(RgbaImage::from_pixel(4, 3, Rgba([9, 9, 9, 255])));
        let copy = raster.clone();
        assert!(copy.shares_pixels_with(&raster));
        assert_eq!(copy.resolution(), Resolution::new(4, 3));
    }

    #[test]
    fn equality_compares_pixels() {
        let a = RasterBuffer::new(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let b = RasterBuffer::new(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let c = RasterBuffer::new(RgbaImage::from_pixel(2, 2, Rgba([4, 3, 2, 1])));
        assert!(!a.shares_pixels_with(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
