// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel sampling at back-projected (fractional) source coordinates.

use flatscan_core::Pixel;

use crate::raster::RasterImage;

/// True when `(x, y)` lies in `[0, width) x [0, height)`.
///
/// NaN fails every comparison, so non-finite coordinates are out of bounds.
#[inline]
fn in_bounds(src: &RasterImage, x: f64, y: f64) -> bool {
    x >= 0.0 && y >= 0.0 && x < src.width() as f64 && y < src.height() as f64
}

/// Nearest-neighbour sample at `(floor(x), floor(y))`, or `background`
/// outside the source.
#[inline]
pub fn sample_nearest(src: &RasterImage, x: f64, y: f64, background: Pixel) -> Pixel {
    if !in_bounds(src, x, y) {
        return background;
    }
    src.pixel(x.floor() as u32, y.floor() as u32)
}

/// Bilinear blend of the four pixels around `(x, y)`, or `background`
/// outside the source.
///
/// Neighbours past the last row or column are clamped to the edge, so
/// integer coordinates reproduce the source pixel exactly.
#[inline]
pub fn sample_bilinear(src: &RasterImage, x: f64, y: f64, background: Pixel) -> Pixel {
    if !in_bounds(src, x, y) {
        return background;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        let v = top * (1.0 - fy) + bottom * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}
