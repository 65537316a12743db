// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification: inverse-mapping perspective warp and the pixel samplers it uses.

pub mod sampling;
pub mod warp;

pub use warp::{Rectifier, rectify};
