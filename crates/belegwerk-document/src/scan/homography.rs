// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography between a detected document and its upright
// rectangle.

use imageproc::geometric_transformations::Projection;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

/// Determinants below this, measured on the conditioned solution scaled to
/// unit Frobenius norm, are treated as a collapsed transform.
const DEGENERATE_DET: f64 = 1e-6;

/// A projective transform `H` with `H * [x, y, 1]^T ~ [u, v, 1]^T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

/// Conditioning transform for four points: centroid to the origin, mean
/// distance from it `sqrt(2)`. Returns the transform and the moved points.
fn normalize_points(pts: &[(f64, f64); 4]) -> (Matrix3<f64>, [(f64, f64); 4]) {
    let cx = pts.iter().map(|p| p.0).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.1).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.0 - cx).hypot(p.1 - cy))
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    (t, pts.map(|p| (s * (p.0 - cx), s * (p.1 - cy))))
}

/// Whether a conditioned matrix is too close to singular to warp with.
fn collapses(matrix: &Matrix3<f64>) -> bool {
    let norm = matrix.norm();
    if !norm.is_finite() || norm == 0.0 {
        return true;
    }
    let det = (matrix / norm).determinant();
    !det.is_finite() || det.abs() < DEGENERATE_DET
}

impl Homography {
    /// Solve for the homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Both point sets are conditioned first, so pixel offsets of the sheet
    /// inside the frame do not affect the solve. In conditioned coordinates
    /// `h33 = 1` is fixed and the 8x8 linear system solved. Returns `None`
    /// when the system is singular (three or more collinear points) or when
    /// the conditioned solution collapses the plane.
    pub fn from_correspondences(src: [(f64, f64); 4], dst: [(f64, f64); 4]) -> Option<Self> {
        let (t_src, src_n) = normalize_points(&src);
        let (t_dst, dst_n) = normalize_points(&dst);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = src_n[i];
            let (u, v) = dst_n[i];
            let r = 2 * i;

            // u * (h7 x + h8 y + 1) = h1 x + h2 y + h3
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            // v * (h7 x + h8 y + 1) = h4 x + h5 y + h6
            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let h = a.lu().solve(&b)?;
        if h.iter().any(|value| !value.is_finite()) {
            return None;
        }

        let conditioned = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if collapses(&conditioned) {
            return None;
        }

        // H = T_dst^-1 * Hn * T_src
        let matrix = t_dst.try_inverse()? * conditioned * t_src;
        let scale = matrix[(2, 2)];
        if !scale.is_finite() || scale.abs() < 1e-15 {
            return None;
        }
        Some(Self {
            matrix: matrix / scale,
        })
    }

    /// Map a point through the transform. `None` for points sent to
    /// infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        if p[2].abs() < 1e-12 {
            return None;
        }
        Some((p[0] / p[2], p[1] / p[2]))
    }

    /// Row-major coefficients.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    /// Convert into an `imageproc` projection for warping.
    pub fn to_projection(&self) -> Option<Projection> {
        Projection::from_matrix(self.to_row_major().map(|v| v as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-6 && (actual.1 - expected.1).abs() < 1e-6,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn maps_control_points_exactly() {
        let src = [(12.0, 20.0), (310.0, 40.0), (330.0, 260.0), (5.0, 240.0)];
        let dst = [(0.0, 0.0), (400.0, 0.0), (400.0, 300.0), (0.0, 300.0)];
        let h = Homography::from_correspondences(src, dst).expect("solvable");
        for (s, d) in src.iter().zip(dst.iter()) {
            let mapped = h.apply(s.0, s.1).expect("finite");
            assert_close(mapped, *d);
        }
    }

    #[test]
    fn identity_for_matching_points() {
        let pts = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let h = Homography::from_correspondences(pts, pts).expect("identity");
        assert_close(h.apply(3.0, 7.0).expect("finite"), (3.0, 7.0));
    }

    #[test]
    fn off_centre_sheet_in_full_hd_frame_is_solvable() {
        let src = [
            (895.2, 475.2),
            (1879.2, 477.6),
            (1881.6, 1039.2),
            (880.8, 1041.6),
        ];
        let dst = [(0.0, 0.0), (1600.0, 0.0), (1600.0, 906.0), (0.0, 906.0)];
        let h = Homography::from_correspondences(src, dst).expect("well-formed sheet");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(s.0, s.1).expect("finite"), *d);
        }
        assert!(h.to_projection().is_some());
    }

    #[test]
    fn off_centre_sheet_in_4k_frame_is_solvable() {
        let src = [
            (1900.0, 1100.0),
            (3700.0, 1100.0),
            (3700.0, 2050.0),
            (1900.0, 2050.0),
        ];
        let dst = [(0.0, 0.0), (1600.0, 0.0), (1600.0, 844.0), (0.0, 844.0)];
        let h = Homography::from_correspondences(src, dst).expect("well-formed sheet");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(s.0, s.1).expect("finite"), *d);
        }
        assert!(h.to_projection().is_some());
    }

    #[test]
    fn collinear_corners_have_no_homography() {
        let src = [(10.0, 10.0), (100.0, 10.0), (190.0, 10.0), (60.0, 10.0)];
        let dst = [(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)];
        assert!(Homography::from_correspondences(src, dst).is_none());
    }

    #[test]
    fn rank_deficient_matrix_has_no_projection() {
        let collapsed = Homography {
            matrix: Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0),
        };
        assert!(collapses(&collapsed.matrix));
        assert!(collapsed.to_projection().is_none());
    }

    #[test]
    fn converts_to_projection() {
        let src = [(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)];
        let dst = [(0.0, 0.0), (200.0, 0.0), (200.0, 100.0), (0.0, 100.0)];
        let h = Homography::from_correspondences(src, dst).expect("scale");
        let projection = h.to_projection().expect("invertible");
        let (u, v) = projection * (50.0f32, 25.0f32);
        assert!((u - 100.0).abs() < 1e-3 && (v - 50.0).abs() < 1e-3);
    }
}
