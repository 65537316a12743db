// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Flatscan: points, corner quadrilaterals, pixels and
// paper sizes.

use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};

/// One RGBA pixel, 8 bits per channel.
pub type Pixel = [u8; 4];

/// Opaque white, the default background for pixels that map outside the source.
pub const WHITE: Pixel = [255, 255, 255, 255];

/// A 2D coordinate in source-image pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Four document corners in the fixed winding order
/// top-left, top-right, bottom-right, bottom-left.
///
/// The winding order is the caller's responsibility. The rectifier never
/// re-sorts the corners; use [`Quadrilateral::order_corners`] when the points
/// come from an unordered source such as a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    corners: [Point; 4],
}

impl Quadrilateral {
    pub const fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            corners: [top_left, top_right, bottom_right, bottom_left],
        }
    }

    /// Wrap four points that are already in TL, TR, BR, BL order.
    pub const fn from_points(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Build a quadrilateral from a slice, checking the corner count and that
    /// every coordinate is finite.
    pub fn from_slice(points: &[Point]) -> Result<Self> {
        let corners: [Point; 4] = points.try_into().map_err(|_| {
            FlatscanError::InvalidCorners(format!("expected 4 corners, got {}", points.len()))
        })?;
        let quad = Self { corners };
        if !quad.is_finite() {
            return Err(FlatscanError::InvalidCorners(
                "corner coordinates must be finite".into(),
            ));
        }
        Ok(quad)
    }

    /// The axis-aligned rectangle `[(0,0), (w,0), (w,h), (0,h)]`.
    pub fn canonical_rect(width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self::new(
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        )
    }

    /// Sort four unordered points into TL, TR, BR, BL.
    ///
    /// Points are ordered clockwise (in image coordinates, y down) around
    /// their centroid, then rotated so the point with the smallest `x + y`
    /// comes first.
    pub fn order_corners(points: [Point; 4]) -> Self {
        let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

        let mut sorted = points;
        sorted.sort_by(|a, b| {
            let angle_a = (a.y - cy).atan2(a.x - cx);
            let angle_b = (b.y - cy).atan2(b.x - cx);
            angle_a.total_cmp(&angle_b)
        });

        let start = sorted
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        sorted.rotate_left(start);

        Self { corners: sorted }
    }

    pub fn points(&self) -> [Point; 4] {
        self.corners
    }

    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Edge lengths as `(top, right, bottom, left)`.
    pub fn edge_lengths(&self) -> (f64, f64, f64, f64) {
        let [tl, tr, br, bl] = self.corners;
        (
            tl.distance(&tr),
            tr.distance(&br),
            br.distance(&bl),
            bl.distance(&tl),
        )
    }

    /// Clamp every corner into `[0, width] x [0, height]`, as a UI does when
    /// the user drags a handle past the image border.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            corners: self
                .corners
                .map(|p| Point::new(p.x.clamp(0.0, w), p.y.clamp(0.0, h))),
        }
    }

    /// Unsigned area via the shoelace formula.
    pub fn area(&self) -> f64 {
        let mut twice = 0.0;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }

    /// Cross product of the incoming and outgoing edge at each corner.
    pub fn corner_turns(&self) -> [f64; 4] {
        let c = &self.corners;
        std::array::from_fn(|i| {
            let (prev, cur, next) = (c[(i + 3) % 4], c[i], c[(i + 1) % 4]);
            (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x)
        })
    }

    /// True when every corner turns the same way, so the outline is convex
    /// and does not cross itself. Either winding direction is accepted.
    pub fn is_convex(&self) -> bool {
        let turns = self.corner_turns();
        turns.iter().all(|t| *t > 0.0) || turns.iter().all(|t| *t < 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(Point::is_finite)
    }
}

/// Standard paper sizes, used to pick an output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Long side divided by short side. `None` for a custom size with a zero side.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let (w, h) = self.dimensions_mm();
        if w == 0 || h == 0 {
            return None;
        }
        Some(w.max(h) as f64 / w.min(h) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_slice_rejects_wrong_count() {
        let pts = [Point::new(0.0, 0.0); 3];
        let err = Quadrilateral::from_slice(&pts).unwrap_err();
        assert!(matches!(err, FlatscanError::InvalidCorners(_)));
    }

    #[test]
    fn from_slice_rejects_nan() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(Quadrilateral::from_slice(&pts).is_err());
    }

    #[test]
    fn order_corners_sorts_shuffled_points() {
        let shuffled = [
            Point::new(310.0, 240.0), // BR
            Point::new(20.0, 10.0),   // TL
            Point::new(15.0, 250.0),  // BL
            Point::new(300.0, 5.0),   // TR
        ];
        let quad = Quadrilateral::order_corners(shuffled);
        assert_eq!(quad.top_left(), Point::new(20.0, 10.0));
        assert_eq!(quad.top_right(), Point::new(300.0, 5.0));
        assert_eq!(quad.bottom_right(), Point::new(310.0, 240.0));
        assert_eq!(quad.bottom_left(), Point::new(15.0, 250.0));
    }

    #[test]
    fn clamp_pulls_corners_inside() {
        let quad = Quadrilateral::new(
            Point::new(-50.0, -50.0),
            Point::new(450.0, 10.0),
            Point::new(390.0, 320.0),
            Point::new(5.0, 290.0),
        );
        let clamped = quad.clamp_to(400, 300);
        assert_eq!(clamped.top_left(), Point::new(0.0, 0.0));
        assert_eq!(clamped.top_right(), Point::new(400.0, 10.0));
        assert_eq!(clamped.bottom_right(), Point::new(390.0, 300.0));
        assert_eq!(clamped.bottom_left(), Point::new(5.0, 290.0));
    }

    #[test]
    fn convexity_accepts_either_winding() {
        let rect = Quadrilateral::canonical_rect(40, 30);
        assert!(rect.is_convex());
        let [tl, tr, br, bl] = rect.points();
        assert!(Quadrilateral::new(tl, bl, br, tr).is_convex());
    }

    #[test]
    fn convexity_rejects_concave_crossed_and_flat_quads() {
        let concave = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 400.0),
        );
        let bowtie = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
        );
        let flat = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        );
        assert!(!concave.is_convex());
        assert!(!bowtie.is_convex());
        assert!(!flat.is_convex());
    }

    #[test]
    fn area_and_edges_of_rectangle() {
        let quad = Quadrilateral::canonical_rect(10, 5);
        assert_relative_eq!(quad.area(), 50.0);
        assert_eq!(quad.edge_lengths(), (10.0, 5.0, 10.0, 5.0));
    }

    #[test]
    fn a4_aspect_ratio() {
        assert_relative_eq!(PaperSize::A4.aspect_ratio().unwrap(), 297.0 / 210.0);
        let bad = PaperSize::Custom {
            width_mm: 0,
            height_mm: 100,
        };
        assert!(bad.aspect_ratio().is_none());
    }
}
