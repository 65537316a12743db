// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic document corner detection. Edge detection plus Hough lines,
// reduced to the four outermost page edges and intersected into corners.

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{DetectionConfig, Point, Quadrilateral};
use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::{debug, info, instrument, warn};

use crate::raster::RasterImage;

/// Finds the four corners of a document lying on a contrasting background.
///
/// ## Pipeline
///
/// 1. Convert to grayscale
/// 2. Gaussian blur for noise reduction
/// 3. Canny edge detection
/// 4. Hough line detection to find dominant straight edges
/// 5. Classify lines as roughly horizontal or roughly vertical
/// 6. Select the outermost edge on each side of the page
/// 7. Intersect neighbouring edges into four corners (TL, TR, BR, BL)
/// 8. Reject quads covering less than `min_area_fraction` of the image
#[derive(Debug, Clone, Default)]
pub struct CornerDetector {
    config: DetectionConfig,
}

impl CornerDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Detect the document quadrilateral in `image`.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RasterImage) -> Result<Quadrilateral> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FlatscanError::DetectionFailed("image is empty".into()));
        }

        let gray: GrayImage = DynamicImage::ImageRgba8(image.to_rgba_image()).to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        debug!(sigma = self.config.blur_sigma, "Edge map computed");

        // Vote threshold proportional to the diagonal so detection scales
        // with resolution; suppression drops near-duplicate lines.
        let diagonal = (width as f64).hypot(height as f64);
        let vote_threshold = (diagonal * 0.25).max(80.0) as u32;
        let options = LineDetectionOptions {
            vote_threshold,
            suppression_radius: self.config.suppression_radius,
        };
        let lines = detect_lines(&edges, options);
        debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

        if lines.len() < 4 {
            return Err(FlatscanError::DetectionFailed(format!(
                "found {} straight edges, need at least 4",
                lines.len()
            )));
        }

        let (horizontal, vertical) = classify_lines(&lines);
        debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Lines classified"
        );
        if horizontal.len() < 2 || vertical.len() < 2 {
            return Err(FlatscanError::DetectionFailed(format!(
                "found {} horizontal and {} vertical edges, need 2 of each",
                horizontal.len(),
                vertical.len()
            )));
        }

        let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
        let edge = |lines: &[PolarLine], kind: EdgeKind| {
            find_extreme_line(lines, cx, cy, kind).ok_or_else(|| {
                FlatscanError::DetectionFailed(format!("no usable {kind:?} edge"))
            })
        };
        let top = edge(horizontal.as_slice(), EdgeKind::Top)?;
        let bottom = edge(horizontal.as_slice(), EdgeKind::Bottom)?;
        let left = edge(vertical.as_slice(), EdgeKind::Left)?;
        let right = edge(vertical.as_slice(), EdgeKind::Right)?;

        let corners = compute_quad_corners(&top, &bottom, &left, &right).ok_or_else(|| {
            FlatscanError::DetectionFailed("page edges are parallel".into())
        })?;
        let quad = Quadrilateral::order_corners(corners);

        let min_area = width as f64 * height as f64 * self.config.min_area_fraction;
        if quad.area() < min_area {
            warn!(
                quad_area = quad.area(),
                min_area, "Detected quadrilateral too small"
            );
            return Err(FlatscanError::DetectionFailed(format!(
                "detected page covers {:.0} px², below the {:.0} px² minimum",
                quad.area(),
                min_area
            )));
        }

        info!(
            top_left = %quad.top_left(),
            top_right = %quad.top_right(),
            bottom_right = %quad.bottom_right(),
            bottom_left = %quad.bottom_left(),
            "Document corners detected"
        );
        Ok(quad)
    }
}

/// Which document edge a line corresponds to.
#[derive(Debug, Clone, Copy)]
enum EdgeKind {
    Top,
    Bottom,
    Left,
    Right,
}

/// Split Hough lines into roughly horizontal and roughly vertical sets.
///
/// `angle_in_degrees` is the angle of the line's normal, so a normal near
/// 90° means a horizontal line and a normal near 0° or 180° a vertical one.
/// Lines within 30° of either axis are kept; diagonal ones are dropped.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }

    (horizontal, vertical)
}

/// Where a line crosses the image's central column (horizontal lines) or
/// central row (vertical lines). `None` if it never does.
fn line_position(line: &PolarLine, cx: f64, cy: f64, horizontal: bool) -> Option<f64> {
    let theta = (line.angle_in_degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();
    let r = line.r as f64;
    let pos = if horizontal {
        // y where x = cx
        (r - cx * cos) / sin
    } else {
        // x where y = cy
        (r - cy * sin) / cos
    };
    pos.is_finite().then_some(pos)
}

/// Select the outermost line for the requested edge, measured through the
/// image centre so that sign flips of `r` near 0°/180° do not matter.
fn find_extreme_line(lines: &[PolarLine], cx: f64, cy: f64, kind: EdgeKind) -> Option<PolarLine> {
    let horizontal = matches!(kind, EdgeKind::Top | EdgeKind::Bottom);
    let positioned = lines
        .iter()
        .filter_map(|l| line_position(l, cx, cy, horizontal).map(|p| (p, *l)));

    let extreme = match kind {
        EdgeKind::Top | EdgeKind::Left => positioned.min_by(|a, b| a.0.total_cmp(&b.0)),
        EdgeKind::Bottom | EdgeKind::Right => positioned.max_by(|a, b| a.0.total_cmp(&b.0)),
    };
    extreme.map(|(_, line)| line)
}

/// Intersect the page edges into `[top_left, top_right, bottom_right, bottom_left]`,
/// or `None` if any pair is (nearly) parallel.
fn compute_quad_corners(
    top: &PolarLine,
    bottom: &PolarLine,
    left: &PolarLine,
    right: &PolarLine,
) -> Option<[Point; 4]> {
    Some([
        intersect_polar_lines(top, left)?,
        intersect_polar_lines(top, right)?,
        intersect_polar_lines(bottom, right)?,
        intersect_polar_lines(bottom, left)?,
    ])
}

/// Intersection of two lines in Hough form `x·cos(θ) + y·sin(θ) = r`.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<Point> {
    let (sin_a, cos_a) = (a.angle_in_degrees as f64).to_radians().sin_cos();
    let (sin_b, cos_b) = (b.angle_in_degrees as f64).to_radians().sin_cos();

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }

    let (r_a, r_b) = (a.r as f64, b.r as f64);
    let x = (r_a * sin_b - r_b * sin_a) / denom;
    let y = (r_b * cos_a - r_a * cos_b) / denom;
    Some(Point::new(x, y))
}
