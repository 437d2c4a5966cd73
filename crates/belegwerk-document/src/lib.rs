// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// belegwerk-document: raster handling for the Belegwerk capture workflow.
//
// Provides immutable raster buffers, document boundary detection with
// perspective rectification (the "scan" pipeline), and JPEG/PNG output
// encoding.

pub mod image;
pub mod raster;
pub mod scan;

// Re-export the primary types so callers can use `belegwerk_document::ContourExtractor` etc.
pub use self::image::encoder::{OutputEncoder, encode};
pub use raster::{PixelFormat, RasterBuffer};
pub use scan::{CaptureResult, ContourExtractor, Homography, QuadExtractor, Quadrilateral};
