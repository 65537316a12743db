// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inverse-mapping perspective warp. Every destination pixel is projected back
// into the source through the output->source homography and sampled there,
// so the output has no holes regardless of foreshortening.

use std::sync::atomic::{AtomicBool, Ordering};

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{Interpolation, Pixel, Quadrilateral, RectifyConfig};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::geometry::homography::{self, HomographyMatrix};
use crate::geometry::sizing::output_size_for_quad;
use crate::raster::{self, CHANNELS, RasterImage};
use crate::rectify::sampling::{sample_bilinear, sample_nearest};

/// Flattens a document quadrilateral into an upright rectangle.
///
/// ```ignore
/// let rectifier = Rectifier::new(RectifyConfig::default());
/// let page = rectifier.rectify(&photo, &corners, 1240, 1754, WHITE)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    config: RectifyConfig,
}

impl Rectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    /// Warp `quad` in `source` onto an `out_width` x `out_height` raster.
    ///
    /// Destination pixels whose back-projection leaves the source receive
    /// `background`. Zero or oversized dimensions fail with
    /// `InvalidDimensions`; a degenerate, concave or self-intersecting quad
    /// fails with `DegenerateGeometry`.
    pub fn rectify(
        &self,
        source: &RasterImage,
        quad: &Quadrilateral,
        out_width: u32,
        out_height: u32,
        background: Pixel,
    ) -> Result<RasterImage> {
        self.run(source, quad, out_width, out_height, background, None)
    }

    /// Like [`Rectifier::rectify`], but checks `cancel` before every output
    /// row and returns `Cancelled` (discarding partial output) once it is set.
    pub fn rectify_with_cancel(
        &self,
        source: &RasterImage,
        quad: &Quadrilateral,
        out_width: u32,
        out_height: u32,
        background: Pixel,
        cancel: &AtomicBool,
    ) -> Result<RasterImage> {
        self.run(source, quad, out_width, out_height, background, Some(cancel))
    }

    /// Size the output from the quad's edges (capped at
    /// `max_output_dimension`) and rectify with the configured background.
    pub fn rectify_auto(&self, source: &RasterImage, quad: &Quadrilateral) -> Result<RasterImage> {
        let (out_w, out_h) = output_size_for_quad(quad, self.config.max_output_dimension)?;
        self.rectify(source, quad, out_w, out_h, self.config.background)
    }

    #[instrument(
        skip(self, source, quad, cancel),
        fields(src_w = source.width(), src_h = source.height())
    )]
    fn run(
        &self,
        source: &RasterImage,
        quad: &Quadrilateral,
        out_width: u32,
        out_height: u32,
        background: Pixel,
        cancel: Option<&AtomicBool>,
    ) -> Result<RasterImage> {
        if out_width == 0 || out_height == 0 {
            return Err(FlatscanError::InvalidDimensions {
                width: out_width,
                height: out_height,
            });
        }
        let len = raster::buffer_len(out_width, out_height)?;

        // A concave or self-intersecting quad sends part of the output behind
        // the line at infinity. Non-finite corners are left to the solver.
        if quad.is_finite() && !quad.is_convex() {
            return Err(FlatscanError::DegenerateGeometry(format!(
                "corners do not form a convex quadrilateral (turns {:?})",
                quad.corner_turns()
            )));
        }

        // Solve output -> source so each destination pixel can be pulled from the source.
        let dst = Quadrilateral::canonical_rect(out_width, out_height);
        let h = homography::solve(&dst.points(), &quad.points())?;
        debug!(matrix = ?h.rows(), "Inverse homography ready");

        let out = self.warp(source, &h, out_width, out_height, len, background, cancel)?;

        info!(
            out_w = out_width,
            out_h = out_height,
            interpolation = ?self.config.interpolation,
            parallel = self.config.parallel,
            "Perspective correction applied"
        );
        Ok(out)
    }

    fn warp(
        &self,
        source: &RasterImage,
        h: &HomographyMatrix,
        out_width: u32,
        out_height: u32,
        len: usize,
        background: Pixel,
        cancel: Option<&AtomicBool>,
    ) -> Result<RasterImage> {
        let stride = out_width as usize * CHANNELS;
        let mut data = vec![0u8; len];
        let interpolation = self.config.interpolation;

        // Rows are disjoint slices of the output, so workers never share writes.
        let fill_row = |(y, row): (usize, &mut [u8])| -> Result<()> {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(FlatscanError::Cancelled);
            }
            warp_row(source, h, y, row, interpolation, background);
            Ok(())
        };

        if self.config.parallel {
            data.par_chunks_mut(stride).enumerate().try_for_each(&fill_row)?;
        } else {
            data.chunks_mut(stride).enumerate().try_for_each(&fill_row)?;
        }

        RasterImage::from_raw(out_width, out_height, data)
    }
}

/// Relative distance within which a back-projected coordinate is taken to
/// sit on a grid line, so solver round-off cannot push an exact pixel corner
/// into the neighbouring pixel under `floor`.
const GRID_SNAP: f64 = 1e-9;

/// Snap `v` onto the nearest integer when it is within round-off of it.
///
/// Never snaps onto or past `limit`, the exclusive source border.
#[inline]
fn snap_to_grid(v: f64, limit: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() <= GRID_SNAP * r.abs().max(1.0) && r < limit {
        r
    } else {
        v
    }
}

/// Fill one destination row.
#[inline]
fn warp_row(
    source: &RasterImage,
    h: &HomographyMatrix,
    y: usize,
    row: &mut [u8],
    interpolation: Interpolation,
    background: Pixel,
) {
    let yf = y as f64;
    let (src_w, src_h) = (source.width() as f64, source.height() as f64);
    for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
        // Behind the horizon nothing in the source is visible.
        let value = match h.project_visible(x as f64, yf) {
            Some((sx, sy)) => {
                let (sx, sy) = (snap_to_grid(sx, src_w), snap_to_grid(sy, src_h));
                match interpolation {
                    Interpolation::Nearest => sample_nearest(source, sx, sy, background),
                    Interpolation::Bilinear => sample_bilinear(source, sx, sy, background),
                }
            }
            None => background,
        };
        px.copy_from_slice(&value);
    }
}

/// Rectify with the default configuration (nearest-neighbour, parallel rows).
pub fn rectify(
    source: &RasterImage,
    quad: &Quadrilateral,
    out_width: u32,
    out_height: u32,
    background: Pixel,
) -> Result<RasterImage> {
    Rectifier::default().rectify(source, quad, out_width, out_height, background)
}
