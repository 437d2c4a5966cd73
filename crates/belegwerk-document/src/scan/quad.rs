// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary quadrilaterals.

use belegwerk_core::Resolution;

/// A 2-D point in raster coordinates.
pub type Point2 = (f32, f32);

/// Four document corners, always ordered top-left, top-right, bottom-right,
/// bottom-left.
///
/// Only constructible through [`Quadrilateral::new`], which guarantees a
/// convex, non-self-intersecting polygon that covers at least the requested
/// fraction of the frame. A failed detection has no quadrilateral at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    corners: [Point2; 4],
}

impl Quadrilateral {
    /// Order and validate four candidate corners found in a `frame`-sized
    /// raster. Returns `None` if they do not describe a usable document
    /// boundary.
    pub fn new(points: [Point2; 4], frame: Resolution, min_area_fraction: f32) -> Option<Self> {
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return None;
        }
        let corners = order_corners(points)?;
        if !is_strictly_convex(&corners) {
            return None;
        }
        let quad = Self { corners };
        let frame_area = frame.area() as f32;
        if frame_area <= 0.0 || quad.area() < frame_area * min_area_fraction {
            return None;
        }
        Some(quad)
    }

    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point2; 4] {
        self.corners
    }

    pub fn top_left(&self) -> Point2 {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point2 {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point2 {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point2 {
        self.corners[3]
    }

    /// Enclosed area in square pixels.
    pub fn area(&self) -> f32 {
        shoelace_area(&self.corners)
    }

    /// Upright rectangle size implied by the corner distances: the longer of
    /// the top/bottom edges by the longer of the left/right edges.
    pub fn rectified_size(&self) -> (f32, f32) {
        let [tl, tr, br, bl] = self.corners;
        let width = distance(tl, tr).max(distance(bl, br));
        let height = distance(tl, bl).max(distance(tr, br));
        (width, height)
    }

    /// The same quadrilateral in a raster scaled by `(sx, sy)`.
    pub(crate) fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            corners: self.corners.map(|(x, y)| (x * sx, y * sy)),
        }
    }

    /// Whether any corner lies within `margin` pixels of the frame edge.
    pub fn touches_border(&self, frame: Resolution, margin: f32) -> bool {
        let (w, h) = (frame.width as f32, frame.height as f32);
        self.corners
            .iter()
            .any(|&(x, y)| x <= margin || y <= margin || x >= w - 1.0 - margin || y >= h - 1.0 - margin)
    }
}

/// Put four points in top-left, top-right, bottom-right, bottom-left order.
///
/// Top-left has the smallest `x + y`, bottom-right the largest; top-right has
/// the smallest `y - x`, bottom-left the largest. When a strongly rotated
/// sheet makes those picks collide, the points are sorted by angle around
/// their centroid instead and rotated so the top-left candidate comes first.
fn order_corners(points: [Point2; 4]) -> Option<[Point2; 4]> {
    let sum = |p: &Point2| p.0 + p.1;
    let diff = |p: &Point2| p.1 - p.0;

    let tl = index_by(&points, sum, false);
    let br = index_by(&points, sum, true);
    let tr = index_by(&points, diff, false);
    let bl = index_by(&points, diff, true);

    let mut seen = [false; 4];
    for idx in [tl, tr, br, bl] {
        seen[idx] = true;
    }
    if seen.iter().all(|s| *s) {
        return Some([points[tl], points[tr], points[br], points[bl]]);
    }

    let cx = points.iter().map(|p| p.0).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.1).sum::<f32>() / 4.0;
    let mut sorted = points;
    // Image y grows downwards, so increasing atan2 walks clockwise on screen.
    sorted.sort_by(|a, b| {
        let ta = (a.1 - cy).atan2(a.0 - cx);
        let tb = (b.1 - cy).atan2(b.0 - cx);
        ta.total_cmp(&tb)
    });
    let start = index_by(&sorted, sum, false);
    sorted.rotate_left(start);
    if distinct(&sorted) { Some(sorted) } else { None }
}

fn index_by(points: &[Point2; 4], key: impl Fn(&Point2) -> f32, max: bool) -> usize {
    let mut best = 0;
    for i in 1..4 {
        let better = if max {
            key(&points[i]) > key(&points[best])
        } else {
            key(&points[i]) < key(&points[best])
        };
        if better {
            best = i;
        }
    }
    best
}

fn distinct(points: &[Point2; 4]) -> bool {
    for i in 0..4 {
        for j in (i + 1)..4 {
            if distance(points[i], points[j]) < 1e-3 {
                return false;
            }
        }
    }
    true
}

/// Every turn has the same, non-zero orientation. For four ordered points
/// this rules out both self-intersection and collinear corners.
fn is_strictly_convex(corners: &[Point2; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
        if cross.abs() < 1e-3 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

fn distance(a: Point2, b: Point2) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Compute the area of a quadrilateral given by four vertices using the
/// shoelace formula. The vertices should be in order (CW or CCW).
pub(crate) fn shoelace_area(corners: &[Point2; 4]) -> f32 {
    let n = corners.len();
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += corners[i].0 * corners[j].1;
        area -= corners[j].0 * corners[i].1;
    }
    area.abs() / 2.0
}
