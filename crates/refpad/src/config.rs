//! Validated application configuration and color utilities.

use serde::{Deserialize, Serialize};

use refpad_color::ColorDetectorParams;
use refpad_core::{rgb_to_hsv, HsvRange};
use refpad_keypoint::PadDetectorParams;

use crate::orchestrator::DetectorMode;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("min_matches must be at least 4, got {0}")]
    MinMatches(usize),
    #[error("ratio_threshold must lie strictly between 0 and 1, got {0}")]
    RatioThreshold(f32),
    #[error("feature_count must be at least 100, got {0}")]
    FeatureCount(usize),
    #[error("contour area bounds invalid: min {min} (floor 10), max {max}")]
    AreaBounds { min: f64, max: f64 },
    #[error("aspect bounds invalid: {min}..{max}")]
    AspectBounds { min: f32, max: f32 },
    #[error("solidity_min must lie in 0..=1, got {0}")]
    Solidity(f64),
    #[error("fill_alpha must lie in 0..=1, got {0}")]
    FillAlpha(f32),
    #[error("HSV band '{name}' is invalid (H 0..=179, lower <= upper)")]
    HsvBand { name: String },
    #[error("invalid color '{text}': expected R,G,B with components 0..=255")]
    ColorTriple { text: String },
    #[error("unknown color name '{name}'")]
    ColorName { name: String },
}

/// Everything one session needs, grouped. Loaded once, read-only while
/// frames are being processed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: DetectorMode,
    #[serde(default)]
    pub detector: PadDetectorParams,
    #[serde(default)]
    pub color: ColorDetectorParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::Auto,
            detector: PadDetectorParams::default(),
            color: ColorDetectorParams::default(),
        }
    }
}

impl AppConfig {
    /// Enforce the documented option ranges. Called once before a session;
    /// detection code assumes a validated configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.detector.matching;
        if m.min_matches < 4 {
            return Err(ConfigError::MinMatches(m.min_matches));
        }
        if !(m.ratio_threshold > 0.0 && m.ratio_threshold < 1.0) {
            return Err(ConfigError::RatioThreshold(m.ratio_threshold));
        }
        if self.detector.features.feature_count < 100 {
            return Err(ConfigError::FeatureCount(self.detector.features.feature_count));
        }

        let c = &self.color;
        if c.min_area < 10.0 || c.max_area < c.min_area {
            return Err(ConfigError::AreaBounds {
                min: c.min_area,
                max: c.max_area,
            });
        }
        if !(c.aspect_min > 0.0 && c.aspect_max >= c.aspect_min) {
            return Err(ConfigError::AspectBounds {
                min: c.aspect_min,
                max: c.aspect_max,
            });
        }
        if !(0.0..=1.0).contains(&c.solidity_min) {
            return Err(ConfigError::Solidity(c.solidity_min));
        }
        for style in [&self.detector.style, &c.style] {
            if !(0.0..=1.0).contains(&style.fill_alpha) {
                return Err(ConfigError::FillAlpha(style.fill_alpha));
            }
        }
        for band in &c.colors {
            if !band.range.is_valid() {
                return Err(ConfigError::HsvBand {
                    name: band.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse `"R,G,B"` into an RGB triple with component validation.
pub fn parse_rgb(text: &str) -> Result<[u8; 3], ConfigError> {
    let err = || ConfigError::ColorTriple {
        text: text.to_string(),
    };
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(err());
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part.parse::<u8>().map_err(|_| err())?;
    }
    Ok(rgb)
}

/// Canonical color-name table. One entry per name; `magenta` maps to a
/// single value.
pub fn named_color(name: &str) -> Result<[u8; 3], ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "red" => Ok([255, 0, 0]),
        "green" => Ok([0, 255, 0]),
        "blue" => Ok([0, 0, 255]),
        "yellow" => Ok([255, 255, 0]),
        "magenta" => Ok([255, 0, 255]),
        "cyan" => Ok([0, 255, 255]),
        "white" => Ok([255, 255, 255]),
        "black" => Ok([0, 0, 0]),
        "orange" => Ok([255, 165, 0]),
        "pink" => Ok([255, 192, 203]),
        "purple" => Ok([128, 0, 128]),
        "lime" => Ok([191, 255, 0]),
        other => Err(ConfigError::ColorName {
            name: other.to_string(),
        }),
    }
}

/// Derive a detection band from a single RGB color: widen the hue by
/// `h_tolerance` and floor saturation/value, so a color can be added without
/// hand-tuning HSV numbers.
pub fn hsv_range_around(rgb: [u8; 3], h_tolerance: u8, s_min: u8, v_min: u8) -> HsvRange {
    let [h, s, v] = rgb_to_hsv(rgb);
    let lower = [
        h.saturating_sub(h_tolerance),
        s.saturating_sub(50).max(s_min),
        v.saturating_sub(50).max(v_min),
    ];
    let upper = [(h as u16 + h_tolerance as u16).min(179) as u8, 255, 255];
    HsvRange::new(lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detector.matching.min_matches = 3;
        assert!(matches!(cfg.validate(), Err(ConfigError::MinMatches(3))));

        let mut cfg = AppConfig::default();
        cfg.detector.matching.ratio_threshold = 1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::RatioThreshold(_))));

        let mut cfg = AppConfig::default();
        cfg.detector.features.feature_count = 99;
        assert!(matches!(cfg.validate(), Err(ConfigError::FeatureCount(99))));

        let mut cfg = AppConfig::default();
        cfg.color.max_area = 100.0;
        cfg.color.min_area = 200.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::AreaBounds { .. })));

        let mut cfg = AppConfig::default();
        cfg.color.solidity_min = 1.2;
        assert!(matches!(cfg.validate(), Err(ConfigError::Solidity(_))));

        let mut cfg = AppConfig::default();
        cfg.color.style.fill_alpha = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::FillAlpha(_))));

        let mut cfg = AppConfig::default();
        cfg.color.colors[0].range.lower[0] = 200;
        assert!(matches!(cfg.validate(), Err(ConfigError::HsvBand { .. })));
    }

    #[test]
    fn rgb_parsing() {
        assert_eq!(parse_rgb("0,255,0").unwrap(), [0, 255, 0]);
        assert_eq!(parse_rgb(" 12 , 34 , 56 ").unwrap(), [12, 34, 56]);
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("300,0,0").is_err());
        assert!(parse_rgb("a,b,c").is_err());
    }

    #[test]
    fn named_colors_are_canonical() {
        assert_eq!(named_color("magenta").unwrap(), [255, 0, 255]);
        assert_eq!(named_color("MAGENTA").unwrap(), [255, 0, 255]);
        assert!(named_color("mauve-ish").is_err());
    }

    #[test]
    fn derived_band_contains_its_color() {
        let rgb = [0, 200, 30];
        let band = hsv_range_around(rgb, 10, 50, 50);
        assert!(band.is_valid());
        assert!(band.contains(rgb_to_hsv(rgb)));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = AppConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode, cfg.mode);
        back.validate().unwrap();
    }
}
