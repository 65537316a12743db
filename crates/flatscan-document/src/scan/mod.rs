// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: automatic corner detection and the scan session that
// chains detection into rectification.

pub mod detect;
pub mod session;

pub use detect::CornerDetector;
pub use session::ScanSession;
