// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography solver. Builds the 8x8 linear system for the
// coefficients h0..h7 (h8 fixed to 1) and solves it by Gaussian elimination
// with partial pivoting.

use std::ops::Index;

use flatscan_core::Point;
use flatscan_core::error::{FlatscanError, Result};
use tracing::{debug, instrument, trace};

/// Pivots and diagonals smaller than this are treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-10;

/// A 3x3 projective transform, normalised so that `h8 == 1`.
///
/// Coefficients are stored row-major:
///
/// ```text
/// | h0 h1 h2 |
/// | h3 h4 h5 |
/// | h6 h7 h8 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomographyMatrix {
    h: [f64; 9],
}

impl HomographyMatrix {
    pub const IDENTITY: Self = Self {
        h: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Build from nine row-major coefficients, rescaling so that `h8 == 1`.
    ///
    /// Returns `None` if `h8` is (nearly) zero or any coefficient is not finite.
    pub fn from_coefficients(h: [f64; 9]) -> Option<Self> {
        let scale = h[8];
        if scale.abs() < PIVOT_TOLERANCE || h.iter().any(|c| !c.is_finite()) {
            return None;
        }
        Some(Self {
            h: h.map(|c| c / scale),
        })
    }

    /// The nine coefficients `h0..h8`, row-major.
    pub fn coefficients(&self) -> [f64; 9] {
        self.h
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let h = &self.h;
        [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]]
    }

    /// Map `(x, y)` without guarding the homogeneous divide.
    ///
    /// When the point maps to the line at infinity the result is infinite or
    /// NaN; callers on the hot path rely on bounds checks rejecting those.
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let h = &self.h;
        let z = h[6] * x + h[7] * y + h[8];
        let sx = (h[0] * x + h[1] * y + h[2]) / z;
        let sy = (h[3] * x + h[4] * y + h[5]) / z;
        (sx, sy)
    }

    /// Map `(x, y)` only when it lies in front of the line at infinity.
    ///
    /// With `h8 == 1` the origin has `z == 1`, so the visible half-plane is
    /// `z > 0`. Points with `z <= 0` would be mirrored through the horizon
    /// and return `None`.
    #[inline]
    pub fn project_visible(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let h = &self.h;
        let z = h[6] * x + h[7] * y + h[8];
        if z.is_nan() || z <= 0.0 {
            return None;
        }
        let sx = (h[0] * x + h[1] * y + h[2]) / z;
        let sy = (h[3] * x + h[4] * y + h[5]) / z;
        Some((sx, sy))
    }

    /// Map a point, or `None` when it lands on the line at infinity.
    pub fn apply(&self, p: Point) -> Option<Point> {
        let h = &self.h;
        let z = h[6] * p.x + h[7] * p.y + h[8];
        if z.abs() < PIVOT_TOLERANCE {
            return None;
        }
        let (x, y) = self.project(p.x, p.y);
        Some(Point::new(x, y))
    }

    pub fn determinant(&self) -> f64 {
        let h = &self.h;
        h[0] * (h[4] * h[8] - h[5] * h[7]) - h[1] * (h[3] * h[8] - h[5] * h[6])
            + h[2] * (h[3] * h[7] - h[4] * h[6])
    }

    /// Inverse transform via the adjugate, renormalised to `h8 == 1`.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < PIVOT_TOLERANCE {
            return None;
        }
        let h = &self.h;
        let adj = [
            h[4] * h[8] - h[5] * h[7],
            h[2] * h[7] - h[1] * h[8],
            h[1] * h[5] - h[2] * h[4],
            h[5] * h[6] - h[3] * h[8],
            h[0] * h[8] - h[2] * h[6],
            h[2] * h[3] - h[0] * h[5],
            h[3] * h[7] - h[4] * h[6],
            h[1] * h[6] - h[0] * h[7],
            h[0] * h[4] - h[1] * h[3],
        ];
        Self::from_coefficients(adj.map(|c| c / det))
    }
}

impl Index<(usize, usize)> for HomographyMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < 3 && col < 3, "homography index ({row}, {col}) out of range");
        &self.h[row * 3 + col]
    }
}

impl Default for HomographyMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Compute the homography mapping each `src[i]` onto `dst[i]`.
///
/// Fails with `DegenerateGeometry` when either point set contains coincident
/// or collinear triples, or when the linear system turns out singular.
#[instrument(level = "debug", skip_all)]
pub fn solve(src: &[Point; 4], dst: &[Point; 4]) -> Result<HomographyMatrix> {
    check_configuration(src, "source")?;
    check_configuration(dst, "destination")?;

    // Augmented matrix [A | b], two rows per correspondence.
    let mut a = [[0.0f64; 9]; 8];
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (sx, sy, dx, dy) = (s.x, s.y, d.x, d.y);
        a[2 * i] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -sx * dx, -sy * dx, dx];
        a[2 * i + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -sx * dy, -sy * dy, dy];
    }

    // Forward elimination with partial pivoting.
    for col in 0..8 {
        let mut pivot_row = col;
        let mut pivot_mag = a[col][col].abs();
        for row in (col + 1)..8 {
            let mag = a[row][col].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < PIVOT_TOLERANCE {
            trace!(col, pivot_mag, "Skipping column with vanishing pivot");
            continue;
        }
        if pivot_row != col {
            a.swap(col, pivot_row);
        }

        let pivot = a[col][col];
        for row in (col + 1)..8 {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in col..9 {
                a[row][c] -= factor * a[col][c];
            }
        }
    }

    // Back-substitution. A vanishing diagonal zeroes its unknown instead of
    // dividing by it; any such column marks the system as singular.
    let mut h = [0.0f64; 9];
    h[8] = 1.0;
    let mut singular_columns = 0usize;
    for row in (0..8).rev() {
        let mut sum = a[row][8];
        for c in (row + 1)..8 {
            sum -= a[row][c] * h[c];
        }
        let diag = a[row][row];
        if diag.abs() < PIVOT_TOLERANCE {
            h[row] = 0.0;
            singular_columns += 1;
        } else {
            h[row] = sum / diag;
        }
    }

    if singular_columns > 0 {
        return Err(FlatscanError::DegenerateGeometry(format!(
            "correspondence system is singular ({singular_columns} vanishing pivots)"
        )));
    }
    if h.iter().any(|c| !c.is_finite()) {
        return Err(FlatscanError::DegenerateGeometry(
            "homography coefficients are not finite".into(),
        ));
    }

    debug!(coefficients = ?h, "Homography solved");
    Ok(HomographyMatrix { h })
}

/// Reject point sets that cannot define a projective frame: non-finite
/// coordinates, coincident points, or three points on one line.
fn check_configuration(points: &[Point; 4], label: &str) -> Result<()> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(FlatscanError::DegenerateGeometry(format!(
            "{label} points contain non-finite coordinates"
        )));
    }

    // Tolerances scale with the extent of the point set so that pixel-sized
    // and unit-sized inputs are judged alike.
    let (min_x, max_x) = min_max(points.iter().map(|p| p.x));
    let (min_y, max_y) = min_max(points.iter().map(|p| p.y));
    let extent = (max_x - min_x).max(max_y - min_y).max(1.0);
    let distance_tol = PIVOT_TOLERANCE * extent;
    let area_tol = PIVOT_TOLERANCE * extent * extent;

    for i in 0..4 {
        for j in (i + 1)..4 {
            if points[i].distance(&points[j]) <= distance_tol {
                return Err(FlatscanError::DegenerateGeometry(format!(
                    "{label} points {i} and {j} coincide at {}",
                    points[i]
                )));
            }
        }
    }

    for skip in 0..4 {
        let mut triple = points.iter().enumerate().filter(|(k, _)| *k != skip).map(|(_, p)| p);
        let (Some(a), Some(b), Some(c)) = (triple.next(), triple.next(), triple.next()) else {
            continue;
        };
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross.abs() <= area_tol {
            return Err(FlatscanError::DegenerateGeometry(format!(
                "three {label} points are collinear ({a}, {b}, {c})"
            )));
        }
    }

    Ok(())
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
