// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session: one photographed page, its configuration, and the
// detect-then-flatten pipeline around the rectifier.

use std::path::Path;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{PaperSize, Quadrilateral, RectifyConfig};
use tracing::{info, instrument, warn};

use crate::geometry::sizing::output_size_for_paper;
use crate::raster::RasterImage;
use crate::rectify::Rectifier;
use crate::scan::detect::CornerDetector;

/// A photographed page moving through the flattening pipeline.
///
/// Transformations consume `self` and return a new session wrapping the
/// result, so steps chain:
///
/// ```ignore
/// let page = ScanSession::open("photo.jpg", RectifyConfig::default())?
///     .auto_flatten()?
///     .into_raster();
/// ```
pub struct ScanSession {
    /// The working image.
    image: RasterImage,
    config: RectifyConfig,
}

impl ScanSession {
    // -- Construction ---------------------------------------------------------

    /// Load the page from a file path.
    pub fn open(path: impl AsRef<Path>, config: RectifyConfig) -> Result<Self> {
        config.validate()?;
        let image = RasterImage::load(path)?;
        Ok(Self { image, config })
    }

    /// Decode the page from raw image bytes (JPEG, PNG, TIFF, etc.).
    pub fn from_bytes(data: &[u8], config: RectifyConfig) -> Result<Self> {
        config.validate()?;
        let image = RasterImage::from_bytes(data)?;
        Ok(Self { image, config })
    }

    /// Wrap an already-decoded raster.
    pub fn from_raster(image: RasterImage, config: RectifyConfig) -> Self {
        Self { image, config }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_raster(&self) -> &RasterImage {
        &self.image
    }

    pub fn into_raster(self) -> RasterImage {
        self.image
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    // -- Pipeline -------------------------------------------------------------

    /// Locate the page corners automatically.
    pub fn detect_corners(&self) -> Result<Quadrilateral> {
        CornerDetector::new(self.config.detection.clone()).detect(&self.image)
    }

    /// Flatten the page outlined by `quad`, sizing the output from its edges.
    #[instrument(skip(self), fields(src_w = self.image.width(), src_h = self.image.height()))]
    pub fn flatten_with(self, quad: &Quadrilateral) -> Result<Self> {
        let image = Rectifier::new(self.config.clone()).rectify_auto(&self.image, quad)?;
        Ok(Self {
            image,
            config: self.config,
        })
    }

    /// Flatten the page outlined by `quad` into the aspect ratio of `paper`.
    #[instrument(skip(self), fields(src_w = self.image.width(), src_h = self.image.height()))]
    pub fn flatten_to_paper(self, quad: &Quadrilateral, paper: PaperSize) -> Result<Self> {
        let (out_w, out_h) = output_size_for_paper(paper, quad, self.config.max_output_dimension)?;
        let image = Rectifier::new(self.config.clone()).rectify(
            &self.image,
            quad,
            out_w,
            out_h,
            self.config.background,
        )?;
        Ok(Self {
            image,
            config: self.config,
        })
    }

    /// Detect the corners and flatten.
    ///
    /// If no page can be found the image is returned unchanged; geometry
    /// errors from a detected quad still propagate.
    #[instrument(skip(self))]
    pub fn auto_flatten(self) -> Result<Self> {
        info!("Running detect + flatten");
        match self.detect_corners() {
            Ok(quad) => self.flatten_with(&quad),
            Err(FlatscanError::DetectionFailed(reason)) => {
                warn!(%reason, "No page found; returning unchanged");
                Ok(self)
            }
            Err(err) => Err(err),
        }
    }
}
