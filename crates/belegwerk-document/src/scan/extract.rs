// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection and perspective rectification.
//
// Turns a raw camera frame into either a cropped, upright document raster or,
// when no document can be found, the untouched frame. Both are ordinary
// outcomes; nothing in here returns an error.

use belegwerk_core::config::DetectionConfig;
use belegwerk_core::{OutputSize, Resolution};
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgba, RgbaImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, warp_into};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use tracing::{debug, info, instrument, warn};

use crate::raster::RasterBuffer;
use crate::scan::enhance::{normalize_contrast, otsu_mask};
use crate::scan::homography::Homography;
use crate::scan::quad::Quadrilateral;

/// Frames whose 1st-99th percentile luma range is narrower than this are
/// considered textureless.
const MIN_LUMA_SPREAD: u8 = 16;

/// Candidates with a corner this close (in analysis pixels) to the frame edge
/// are the frame itself or a sheet that is partly out of view.
const BORDER_MARGIN: f32 = 2.0;

/// Contours shorter than this many points are noise.
const MIN_CONTOUR_POINTS: usize = 8;

/// Fill colour for warp samples that land outside the source frame.
const PAPER_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The outcome of one extraction attempt.
#[derive(Debug, Clone)]
pub enum CaptureResult {
    /// A document was found and rectified.
    Detected {
        raster: RasterBuffer,
        /// Boundary in the raw frame's coordinates.
        quad: Quadrilateral,
    },
    /// No usable boundary; the raw frame, unchanged.
    FallbackRaw(RasterBuffer),
}

impl CaptureResult {
    /// The raster to review and encode.
    pub fn raster(&self) -> &RasterBuffer {
        match self {
            Self::Detected { raster, .. } | Self::FallbackRaw(raster) => raster,
        }
    }

    pub fn into_raster(self) -> RasterBuffer {
        match self {
            Self::Detected { raster, .. } | Self::FallbackRaw(raster) => raster,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }

    /// The detected boundary, if any.
    pub fn quad(&self) -> Option<&Quadrilateral> {
        match self {
            Self::Detected { quad, .. } => Some(quad),
            Self::FallbackRaw(_) => None,
        }
    }
}

/// Anything that can turn a raw frame into a [`CaptureResult`].
///
/// Implementations must be total: every structurally valid raster yields a
/// result, with [`CaptureResult::FallbackRaw`] standing in for any failure.
pub trait QuadExtractor {
    fn extract(&self, raw: &RasterBuffer) -> CaptureResult;
}

/// Reference extractor: edge and contour analysis followed by a homography
/// warp.
///
/// ## Pipeline
///
/// 1. Convert to grayscale, downscale for analysis, stretch contrast
/// 2. Gaussian blur, Canny edges, dilation to close small gaps
/// 3. Trace contours of the edge map and of an Otsu foreground mask
/// 4. Approximate each contour with a polygon (Douglas-Peucker) and keep
///    convex quadrilaterals above the minimum area
/// 5. Take the largest, order its corners, and map it to an upright
///    rectangle with a homography
/// 6. Resample the full-resolution frame with bilinear interpolation
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    config: DetectionConfig,
}

impl ContourExtractor {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Locate the largest document-like quadrilateral in `raw`, in raw frame
    /// coordinates.
    #[instrument(skip_all, fields(width = raw.width(), height = raw.height()))]
    pub fn detect(&self, raw: &RasterBuffer) -> Option<Quadrilateral> {
        let (orig_w, orig_h) = (raw.width(), raw.height());
        if orig_w < 3 || orig_h < 3 {
            debug!("Frame too small to analyse");
            return None;
        }

        // Step 1: grayscale, downscale, contrast.
        let gray = imageops::grayscale(raw.as_image());
        let (gray, scale) = downscale(gray, self.config.analysis_max_edge);
        let frame = Resolution::new(gray.width(), gray.height());

        let normalized = match normalize_contrast(&gray, MIN_LUMA_SPREAD) {
            Some(n) => n,
            None => {
                debug!("Frame has too little contrast for boundary detection");
                return None;
            }
        };

        // Step 2: edges.
        let blurred = gaussian_blur_f32(&normalized, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        let closed = dilate(&edges, Norm::LInf, 1);

        // Step 3+4: candidates from both the edge map and the foreground mask.
        let mut candidates = self.quad_candidates(&closed, frame);
        candidates.extend(self.quad_candidates(&otsu_mask(&blurred), frame));
        debug!(candidates = candidates.len(), "Quadrilateral candidates found");

        // Step 5: largest wins.
        let best = candidates
            .into_iter()
            .max_by(|a, b| a.area().total_cmp(&b.area()))?;

        let quad = best.scaled(1.0 / scale, 1.0 / scale);
        debug!(
            top_left = ?quad.top_left(),
            top_right = ?quad.top_right(),
            bottom_right = ?quad.bottom_right(),
            bottom_left = ?quad.bottom_left(),
            area_fraction = quad.area() / (orig_w as f32 * orig_h as f32),
            "Document boundary detected"
        );
        Some(quad)
    }

    /// Warp the region inside `quad` to an upright rectangle.
    ///
    /// Returns `None` if the transform is degenerate.
    #[instrument(skip_all)]
    pub fn rectify(&self, raw: &RasterBuffer, quad: &Quadrilateral) -> Option<RasterBuffer> {
        let (out_w, out_h) = output_dimensions(quad, self.config.output_size);

        let dest = [
            (0.0, 0.0),                         // top-left
            (out_w as f64, 0.0),                // top-right
            (out_w as f64, out_h as f64),       // bottom-right
            (0.0, out_h as f64),                // bottom-left
        ];
        let src = quad.corners().map(|(x, y)| (x as f64, y as f64));

        let homography = match Homography::from_correspondences(src, dest) {
            Some(h) => h,
            None => {
                warn!("Degenerate perspective transform; keeping the raw frame");
                return None;
            }
        };
        let projection = match homography.to_projection() {
            Some(p) => p,
            None => {
                warn!("Projection is not invertible; keeping the raw frame");
                return None;
            }
        };

        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(
            raw.as_image(),
            &projection,
            Interpolation::Bilinear,
            PAPER_WHITE,
            &mut output,
        );

        info!(out_w, out_h, "Perspective correction applied");
        Some(RasterBuffer::new(output))
    }

    /// Trace contours in a binary image and keep the ones that approximate a
    /// valid document quadrilateral.
    fn quad_candidates(&self, binary: &GrayImage, frame: Resolution) -> Vec<Quadrilateral> {
        let contours = find_contours::<i32>(binary);
        let mut quads = Vec::new();

        for contour in &contours {
            if contour.points.len() < MIN_CONTOUR_POINTS {
                continue;
            }
            let perimeter = arc_length(&contour.points, true);
            let epsilon = (self.config.polygon_epsilon * perimeter).max(1.0);
            let polygon = approximate_polygon_dp(&contour.points, epsilon, true);
            if polygon.len() != 4 {
                continue;
            }

            let points = [
                to_f32(polygon[0]),
                to_f32(polygon[1]),
                to_f32(polygon[2]),
                to_f32(polygon[3]),
            ];
            if let Some(quad) = Quadrilateral::new(points, frame, self.config.min_area_fraction) {
                if !quad.touches_border(frame, BORDER_MARGIN) {
                    quads.push(quad);
                }
            }
        }

        quads
    }
}

impl QuadExtractor for ContourExtractor {
    #[instrument(skip_all, fields(width = raw.width(), height = raw.height()))]
    fn extract(&self, raw: &RasterBuffer) -> CaptureResult {
        let Some(quad) = self.detect(raw) else {
            warn!("No document boundary found; falling back to the raw frame");
            return CaptureResult::FallbackRaw(raw.clone());
        };
        self.rectify_or_fallback(raw, quad)
    }
}

impl ContourExtractor {
    /// Rectify a detected `quad`, keeping the raw frame when the transform
    /// is degenerate.
    fn rectify_or_fallback(&self, raw: &RasterBuffer, quad: Quadrilateral) -> CaptureResult {
        match self.rectify(raw, &quad) {
            Some(raster) => CaptureResult::Detected { raster, quad },
            None => CaptureResult::FallbackRaw(raw.clone()),
        }
    }
}

/// Shrink `gray` so its longer side is at most `max_edge`. Returns the image
/// and the factor applied (1.0 when untouched).
fn downscale(gray: GrayImage, max_edge: u32) -> (GrayImage, f32) {
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest <= max_edge {
        return (gray, 1.0);
    }
    let scale = max_edge as f32 / longest as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    let new_h = ((h as f32 * scale).round() as u32).max(1);
    debug!(new_w, new_h, "Downscaled frame for analysis");
    // Report the exact ratio actually applied per axis; they differ only by
    // rounding, so the horizontal one is used for both.
    let applied = new_w as f32 / w as f32;
    (imageops::resize(&gray, new_w, new_h, FilterType::Triangle), applied)
}

/// Output raster size for a detected quadrilateral.
fn output_dimensions(quad: &Quadrilateral, size: OutputSize) -> (u32, u32) {
    match size {
        OutputSize::Exact { width, height } => (width.max(1), height.max(1)),
        OutputSize::FitLongEdge(long_edge) => {
            let (w, h) = quad.rectified_size();
            let long_edge = long_edge.max(1) as f32;
            let (out_w, out_h) = if w >= h {
                (long_edge, long_edge * h / w)
            } else {
                (long_edge * w / h, long_edge)
            };
            ((out_w.round() as u32).max(1), (out_h.round() as u32).max(1))
        }
    }
}

fn to_f32(point: Point<i32>) -> (f32, f32) {
    (point.x as f32, point.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use belegwerk_bridge::synthetic::{blank_frame, centred_corners, centred_document_frame, document_frame};
    use image::Rgba;

    fn extractor(output_size: OutputSize) -> ContourExtractor {
        ContourExtractor::new(DetectionConfig {
            output_size,
            ..DetectionConfig::default()
        })
    }

    fn assert_near(actual: (f32, f32), expected: (f32, f32), tolerance: f32) {
        assert!(
            (actual.0 - expected.0).abs() <= tolerance && (actual.1 - expected.1).abs() <= tolerance,
            "expected {:?} within {}, got {:?}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn blank_frame_falls_back_unchanged() {
        let raw = RasterBuffer::new(blank_frame(200, 300));
        let result = ContourExtractor::default().extract(&raw);

        match &result {
            CaptureResult::FallbackRaw(raster) => {
                assert!(raster.shares_pixels_with(&raw));
                assert_eq!(raster, &raw);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert!(result.quad().is_none());
    }

    #[test]
    fn small_document_is_rejected_as_noise() {
        // 10% of the frame: below the 20% minimum.
        let raw = RasterBuffer::new(centred_document_frame(400, 300, 0.10));
        let result = ContourExtractor::default().extract(&raw);
        assert!(!result.is_detected());
        assert_eq!(result.raster(), &raw);
    }

    #[test]
    fn axis_aligned_document_is_detected() {
        let corners = centred_corners(400, 300, 0.6);
        let raw = RasterBuffer::new(document_frame(400, 300, corners));
        let result = extractor(OutputSize::FitLongEdge(600)).extract(&raw);

        let quad = *result.quad().expect("document should be detected");
        for (found, known) in quad.corners().iter().zip(corners.iter()) {
            assert_near(*found, *known, 5.0);
        }

        let raster = result.raster();
        assert_eq!(raster.width(), 600);
        let aspect = raster.width() as f32 / raster.height() as f32;
        assert!((aspect - 4.0 / 3.0).abs() < 0.05, "aspect {aspect}");
    }

    #[test]
    fn perspective_document_uses_corner_distances() {
        let corners = [(90.0, 50.0), (320.0, 70.0), (350.0, 250.0), (60.0, 240.0)];
        let raw = RasterBuffer::new(document_frame(400, 300, corners));
        let result = extractor(OutputSize::FitLongEdge(500)).extract(&raw);
        assert!(result.is_detected(), "trapezoid should be detected");

        let top = ((320.0f32 - 90.0).powi(2) + (70.0f32 - 50.0).powi(2)).sqrt();
        let bottom = ((350.0f32 - 60.0).powi(2) + (250.0f32 - 240.0).powi(2)).sqrt();
        let left = ((60.0f32 - 90.0).powi(2) + (240.0f32 - 50.0).powi(2)).sqrt();
        let right = ((350.0f32 - 320.0).powi(2) + (250.0f32 - 70.0).powi(2)).sqrt();
        let expected = top.max(bottom) / left.max(right);

        let raster = result.raster();
        let aspect = raster.width() as f32 / raster.height() as f32;
        assert!(
            (aspect - expected).abs() / expected < 0.05,
            "aspect {aspect}, expected {expected}"
        );
    }

    #[test]
    fn exact_output_size_is_honoured() {
        let corners = [(90.0, 50.0), (320.0, 70.0), (350.0, 250.0), (60.0, 240.0)];
        let raw = RasterBuffer::new(document_frame(400, 300, corners));
        let size = OutputSize::Exact {
            width: 210,
            height: 297,
        };
        let result = extractor(size).extract(&raw);
        assert!(result.is_detected());
        assert_eq!(result.raster().resolution(), Resolution::new(210, 297));
    }

    #[test]
    fn rectified_output_is_mostly_paper() {
        let raw = RasterBuffer::new(centred_document_frame(400, 300, 0.5));
        let result = extractor(OutputSize::FitLongEdge(200)).extract(&raw);
        let raster = result.raster();
        assert!(result.is_detected());

        let centre = raster.as_image().get_pixel(raster.width() / 2, raster.height() / 2);
        let Rgba([r, g, b, _]) = *centre;
        assert!(r > 200 && g > 200 && b > 200, "centre pixel {centre:?}");
    }

    #[test]
    fn large_frames_are_analysed_downscaled() {
        let corners = centred_corners(1920, 1080, 0.6);
        let raw = RasterBuffer::new(document_frame(1920, 1080, corners));
        let result = ContourExtractor::default().extract(&raw);

        let quad = *result.quad().expect("document should be detected");
        for (found, known) in quad.corners().iter().zip(corners.iter()) {
            assert_near(*found, *known, 12.0);
        }
        assert_eq!(result.raster().width(), 1600);
    }

    #[test]
    fn off_centre_document_in_full_hd_frame_is_rectified() {
        let corners = [(880.0, 480.0), (1880.0, 480.0), (1880.0, 1040.0), (880.0, 1040.0)];
        let raw = RasterBuffer::new(document_frame(1920, 1080, corners));
        let result = ContourExtractor::default().extract(&raw);

        let quad = *result.quad().expect("off-centre sheet should be detected");
        for (found, known) in quad.corners().iter().zip(corners.iter()) {
            assert_near(*found, *known, 20.0);
        }
        assert!(result.is_detected());

        let raster = result.raster();
        assert_eq!(raster.width(), 1600);
        let aspect = raster.width() as f32 / raster.height() as f32;
        let expected = 1000.0 / 560.0;
        assert!(
            (aspect - expected).abs() / expected < 0.05,
            "aspect {aspect}, expected {expected}"
        );
    }

    #[test]
    fn off_centre_document_in_4k_frame_is_rectified() {
        let corners = [(1900.0, 1100.0), (3700.0, 1100.0), (3700.0, 2050.0), (1900.0, 2050.0)];
        let raw = RasterBuffer::new(document_frame(3840, 2160, corners));
        let result = ContourExtractor::default().extract(&raw);
        assert!(result.is_detected(), "off-centre 4K sheet should be rectified");

        let raster = result.raster();
        assert_eq!(raster.width(), 1600);
        let aspect = raster.width() as f32 / raster.height() as f32;
        let expected = 1800.0 / 950.0;
        assert!(
            (aspect - expected).abs() / expected < 0.05,
            "aspect {aspect}, expected {expected}"
        );
    }

    #[test]
    fn degenerate_transform_keeps_the_raw_frame() {
        let raw = RasterBuffer::new(centred_document_frame(400, 300, 0.6));
        let valid = Quadrilateral::new(
            [(60.0, 50.0), (340.0, 50.0), (340.0, 250.0), (60.0, 250.0)],
            raw.resolution(),
            0.2,
        )
        .expect("quad");
        let collapsed = valid.scaled(1.0, 0.0);

        let extractor = ContourExtractor::default();
        assert!(extractor.rectify(&raw, &collapsed).is_none());

        match extractor.rectify_or_fallback(&raw, collapsed) {
            CaptureResult::FallbackRaw(raster) => {
                assert!(raster.shares_pixels_with(&raw));
                assert_eq!(raster, raw);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn tiny_frame_falls_back() {
        let raw = RasterBuffer::new(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        assert!(!ContourExtractor::default().extract(&raw).is_detected());
    }

    #[test]
    fn output_dimensions_fit_long_edge() {
        let quad = Quadrilateral::new(
            [(0.0, 0.0), (300.0, 0.0), (300.0, 100.0), (0.0, 100.0)],
            Resolution::new(400, 400),
            0.1,
        )
        .expect("quad");
        assert_eq!(output_dimensions(&quad, OutputSize::FitLongEdge(900)), (900, 300));

        let tall = Quadrilateral::new(
            [(0.0, 0.0), (100.0, 0.0), (100.0, 300.0), (0.0, 300.0)],
            Resolution::new(400, 400),
            0.1,
        )
        .expect("quad");
        assert_eq!(output_dimensions(&tall, OutputSize::FitLongEdge(900)), (300, 900));
    }

    mod totality {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(48))]

            #[test]
            fn extract_never_panics(
                width in 1u32..48,
                height in 1u32..48,
                seed in any::<u64>(),
            ) {
                let mut state = seed | 1;
                let frame = RgbaImage::from_fn(width, height, |_, _| {
                    // xorshift64
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    let v = (state & 0xff) as u8;
                    Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255])
                });
                let raw = RasterBuffer::new(frame);
                let result = ContourExtractor::default().extract(&raw);
                if !result.is_detected() {
                    prop_assert_eq!(result.raster(), &raw);
                }
            }
        }
    }
}
