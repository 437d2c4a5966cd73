// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: contrast preparation, quadrilateral detection, and
// perspective rectification of photographed documents.

pub mod enhance;
pub mod extract;
pub mod homography;
pub mod quad;

pub use extract::{CaptureResult, ContourExtractor, QuadExtractor};
pub use homography::Homography;
pub use quad::{Point2, Quadrilateral};
