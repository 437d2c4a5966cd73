// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic camera: a scriptable stand-in for device hardware, plus frame
// generators that paint paper-like quadrilaterals on a dark desk.
//
// Not for production capture: it exists so the workflow, its tests, and its
// benchmarks run without a physical camera.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use belegwerk_core::error::{BelegwerkError, Result};
use belegwerk_core::Resolution;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::debug;

use crate::traits::*;

/// Desk colour behind synthetic documents.
pub const DESK: Rgba<u8> = Rgba([32, 30, 28, 255]);
/// Paper colour of synthetic documents.
pub const PAPER: Rgba<u8> = Rgba([236, 234, 228, 255]);

/// Open/stop counters shared between a camera and the streams it opened.
#[derive(Debug, Clone, Default)]
pub struct CameraStats {
    opens: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl CameraStats {
    /// Number of successful `open_stream` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls received by any stream.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// A camera that shows whatever frame the test puts in front of it.
#[derive(Clone)]
pub struct SyntheticCamera {
    scene: Arc<Mutex<Arc<RgbaImage>>>,
    stats: CameraStats,
    denied: bool,
}

impl SyntheticCamera {
    /// A camera currently looking at `frame`.
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            scene: Arc::new(Mutex::new(Arc::new(frame))),
            stats: CameraStats::default(),
            denied: false,
        }
    }

    /// A camera whose permission prompt is always refused.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::new(RgbaImage::new(1, 1))
        }
    }

    /// Replace what the camera sees. Open streams pick it up on their next
    /// pull.
    pub fn show(&self, frame: RgbaImage) {
        let mut scene = self.scene.lock().unwrap_or_else(|e| e.into_inner());
        *scene = Arc::new(frame);
    }

    /// Counters for asserting acquisition and release.
    pub fn stats(&self) -> CameraStats {
        self.stats.clone()
    }
}

impl PlatformBridge for SyntheticCamera {
    fn platform_name(&self) -> &str {
        "Synthetic"
    }
}

impl NativeCamera for SyntheticCamera {
    fn open_stream(&self, request: &StreamRequest) -> Result<Box<dyn VideoSource>> {
        if self.denied {
            return Err(BelegwerkError::CameraUnavailable(
                "permission denied by user".into(),
            ));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        debug!(requested = %request.ideal, "Synthetic stream opened");
        Ok(Box::new(SyntheticStream {
            scene: Arc::clone(&self.scene),
            stats: self.stats.clone(),
            active: true,
        }))
    }
}

struct SyntheticStream {
    scene: Arc<Mutex<Arc<RgbaImage>>>,
    stats: CameraStats,
    active: bool,
}

impl VideoSource for SyntheticStream {
    fn resolution(&self) -> Resolution {
        let scene = self.scene.lock().unwrap_or_else(|e| e.into_inner());
        Resolution::new(scene.width(), scene.height())
    }

    fn latest_frame(&mut self) -> Result<Option<Arc<RgbaImage>>> {
        if !self.active {
            return Err(BelegwerkError::SessionInactive);
        }
        let scene = self.scene.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Some(Arc::clone(&scene)))
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        self.active = false;
    }
}

// -- Frame generators ---------------------------------------------------------

/// A featureless desk with no document on it.
pub fn blank_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, DESK)
}

/// A sheet of paper with the given corners (any winding) lying on the desk.
pub fn document_frame(width: u32, height: u32, corners: [(f32, f32); 4]) -> RgbaImage {
    let mut frame = blank_frame(width, height);
    let polygon: Vec<Point<i32>> = corners
        .iter()
        .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    draw_polygon_mut(&mut frame, &polygon, PAPER);
    frame
}

/// An axis-aligned sheet centred in the frame, covering `fraction` of its
/// area with the frame's own aspect ratio.
pub fn centred_document_frame(width: u32, height: u32, fraction: f32) -> RgbaImage {
    document_frame(width, height, centred_corners(width, height, fraction))
}

/// Corners (top-left, top-right, bottom-right, bottom-left) of the sheet
/// drawn by [`centred_document_frame`].
pub fn centred_corners(width: u32, height: u32, fraction: f32) -> [(f32, f32); 4] {
    let scale = fraction.clamp(0.0, 1.0).sqrt();
    let (w, h) = (width as f32, height as f32);
    let (doc_w, doc_h) = (w * scale, h * scale);
    let (x0, y0) = ((w - doc_w) / 2.0, (h - doc_h) / 2.0);
    [
        (x0, y0),
        (x0 + doc_w, y0),
        (x0 + doc_w, y0 + doc_h),
        (x0, y0 + doc_h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_opens_and_stops() {
        let camera = SyntheticCamera::new(blank_frame(16, 16));
        let stats = camera.stats();
        let mut stream = camera.open_stream(&StreamRequest::default()).expect("open");
        assert_eq!(stats.opens(), 1);
        stream.stop();
        assert_eq!(stats.stops(), 1);
        assert!(stream.latest_frame().is_err());
    }

    #[test]
    fn denied_camera_never_opens() {
        let camera = SyntheticCamera::denied();
        assert!(matches!(
            camera.open_stream(&StreamRequest::default()),
            Err(BelegwerkError::CameraUnavailable(_))
        ));
        assert_eq!(camera.stats().opens(), 0);
    }

    #[test]
    fn streams_see_scene_changes() {
        let camera = SyntheticCamera::new(blank_frame(10, 10));
        let mut stream = camera.open_stream(&StreamRequest::default()).expect("open");
        camera.show(blank_frame(20, 12));
        let frame = stream.latest_frame().expect("pull").expect("frame");
        assert_eq!(frame.dimensions(), (20, 12));
        assert_eq!(stream.resolution(), Resolution::new(20, 12));
    }

    #[test]
    fn centred_document_covers_requested_fraction() {
        let frame = centred_document_frame(200, 100, 0.6);
        let paper = frame.pixels().filter(|p| **p == PAPER).count() as f32;
        let fraction = paper / (200.0 * 100.0);
        assert!((fraction - 0.6).abs() < 0.03, "covered {fraction}");
    }
}
