// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification and detection configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};
use crate::types::{Pixel, WHITE};

/// How a source pixel is chosen for a back-projected coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Take the pixel at `(floor(x), floor(y))`.
    #[default]
    Nearest,
    /// Blend the four surrounding pixels.
    Bilinear,
}

/// Tuning knobs for automatic corner detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Gaussian blur sigma applied before edge detection.
    pub blur_sigma: f32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Smallest accepted document area as a fraction of the image area.
    pub min_area_fraction: f64,
    /// Hough non-maximum suppression radius, in accumulator cells.
    pub suppression_radius: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            min_area_fraction: 0.10,
            suppression_radius: 8,
        }
    }
}

/// Settings for a rectification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Sampling mode. Nearest-neighbour keeps the identity warp exact.
    pub interpolation: Interpolation,
    /// Colour written where the back-projected coordinate leaves the source.
    pub background: Pixel,
    /// Shard destination rows across the rayon thread pool.
    pub parallel: bool,
    /// Upper bound on either side of an automatically sized output.
    pub max_output_dimension: u32,
    /// Automatic corner detection settings.
    pub detection: DetectionConfig,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Nearest,
            background: WHITE,
            parallel: true,
            max_output_dimension: 2400,
            detection: DetectionConfig::default(),
        }
    }
}

impl RectifyConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_output_dimension == 0 {
            return Err(FlatscanError::Config(
                "max_output_dimension must be at least 1".into(),
            ));
        }
        let det = &self.detection;
        for (name, value) in [
            ("blur_sigma", det.blur_sigma),
            ("canny_low", det.canny_low),
            ("canny_high", det.canny_high),
        ] {
            if !value.is_finite() {
                return Err(FlatscanError::Config(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        if det.blur_sigma <= 0.0 {
            return Err(FlatscanError::Config(format!(
                "blur_sigma must be positive, got {}",
                det.blur_sigma
            )));
        }
        if det.canny_low > det.canny_high {
            return Err(FlatscanError::Config(format!(
                "canny_low ({}) exceeds canny_high ({})",
                det.canny_low, det.canny_high
            )));
        }
        if !(0.0..=1.0).contains(&det.min_area_fraction) {
            return Err(FlatscanError::Config(format!(
                "min_area_fraction must lie in [0, 1], got {}",
                det.min_area_fraction
            )));
        }
        Ok(())
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RectifyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interpolation, Interpolation::Nearest);
        assert_eq!(config.background, [255, 255, 255, 255]);
        assert_eq!(config.max_output_dimension, 2400);
    }

    #[test]
    fn rejects_zero_max_dimension() {
        let config = RectifyConfig {
            max_output_dimension: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FlatscanError::Config(_))));
    }

    #[test]
    fn rejects_inverted_canny_thresholds() {
        let mut config = RectifyConfig::default();
        config.detection.canny_low = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_detection_values() {
        let cases = [
            DetectionConfig {
                blur_sigma: f32::INFINITY,
                ..Default::default()
            },
            DetectionConfig {
                canny_low: f32::NAN,
                ..Default::default()
            },
            DetectionConfig {
                canny_high: f32::NAN,
                ..Default::default()
            },
            DetectionConfig {
                min_area_fraction: f64::NAN,
                ..Default::default()
            },
        ];
        for detection in cases {
            let config = RectifyConfig {
                detection,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(FlatscanError::Config(_))),
                "{:?}",
                config.detection
            );
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RectifyConfig =
            serde_json::from_str(r#"{ "interpolation": "bilinear", "parallel": false }"#).unwrap();
        assert_eq!(config.interpolation, Interpolation::Bilinear);
        assert!(!config.parallel);
        assert_eq!(config.max_output_dimension, 2400);
        assert_eq!(config.detection, DetectionConfig::default());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flatscan.json");
        let config = RectifyConfig {
            background: [0, 0, 0, 255],
            max_output_dimension: 1200,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = RectifyConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "max_output_dimension": 0 }"#).unwrap();
        assert!(matches!(
            RectifyConfig::load(&path),
            Err(FlatscanError::Config(_))
        ));
    }
}
