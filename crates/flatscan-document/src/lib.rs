// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan-document: perspective rectification for photographed documents.
//
// Provides the four-point homography solver, the inverse-mapping warp that
// flattens a corner quadrilateral into an upright page, output sizing, RGBA
// raster I/O, and automatic corner detection.

pub mod geometry;
pub mod raster;
pub mod rectify;
pub mod scan;

// Re-export the primary items so callers can use `flatscan_document::Rectifier` etc.
pub use geometry::{HomographyMatrix, output_size_for_paper, output_size_for_quad, solve};
pub use raster::RasterImage;
pub use rectify::{Rectifier, rectify};
pub use scan::{CornerDetector, ScanSession};
