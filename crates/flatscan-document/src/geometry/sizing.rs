// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output-size policy: derive a destination rectangle from the measured edges
// of a corner quadrilateral.

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{PaperSize, Quadrilateral};
use tracing::debug;

/// Measured `(width, height)` of a quad: the longer of each pair of opposite edges.
fn measured_extent(quad: &Quadrilateral) -> (f64, f64) {
    let (top, right, bottom, left) = quad.edge_lengths();
    (top.max(bottom), left.max(right))
}

fn check_max(max_dimension: u32) -> Result<()> {
    if max_dimension == 0 {
        return Err(FlatscanError::Config(
            "max_output_dimension must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Output size that preserves the quad's measured aspect ratio.
///
/// Width is the longer of the top/bottom edges and height the longer of the
/// left/right edges. When either exceeds `max_dimension` both are scaled down
/// uniformly so the larger side equals `max_dimension`.
pub fn output_size_for_quad(quad: &Quadrilateral, max_dimension: u32) -> Result<(u32, u32)> {
    check_max(max_dimension)?;
    let (width, height) = measured_extent(quad);

    let (w, h) = (width.round(), height.round());
    if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
        return Err(FlatscanError::InvalidDimensions {
            width: if w.is_finite() { w as u32 } else { 0 },
            height: if h.is_finite() { h as u32 } else { 0 },
        });
    }

    let longest = width.max(height);
    let limit = max_dimension as f64;
    let (out_w, out_h) = if longest > limit {
        let scale = limit / longest;
        (
            ((width * scale).round() as u32).clamp(1, max_dimension),
            ((height * scale).round() as u32).clamp(1, max_dimension),
        )
    } else {
        (w as u32, h as u32)
    };

    debug!(width, height, out_w, out_h, "Output size derived from quad");
    Ok((out_w, out_h))
}

/// Output size with the aspect ratio of `paper`.
///
/// The orientation (portrait or landscape) follows the quad's measured shape;
/// the long side is the quad's measured long side, capped at `max_dimension`.
pub fn output_size_for_paper(
    paper: PaperSize,
    quad: &Quadrilateral,
    max_dimension: u32,
) -> Result<(u32, u32)> {
    check_max(max_dimension)?;
    let ratio = paper.aspect_ratio().ok_or_else(|| {
        FlatscanError::Config(format!("paper size {paper:?} has a zero side"))
    })?;
    let (width, height) = output_size_for_quad(quad, u32::MAX)?;

    let long = width.max(height).min(max_dimension);
    let short = ((long as f64 / ratio).round() as u32).max(1);
    let size = if width >= height {
        (long, short)
    } else {
        (short, long)
    };

    debug!(?paper, out_w = size.0, out_h = size.1, "Output size derived from paper");
    Ok(size)
}
