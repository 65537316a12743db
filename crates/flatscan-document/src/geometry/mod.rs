// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Projective geometry: the four-point homography solver and the output-size
// policy for rectified pages.

pub mod homography;
pub mod sizing;

pub use homography::{HomographyMatrix, PIVOT_TOLERANCE, solve};
pub use sizing::{output_size_for_paper, output_size_for_quad};
