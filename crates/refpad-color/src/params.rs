use serde::{Deserialize, Serialize};

use refpad_core::{DrawStyle, HsvRange};

/// A detection color: label plus HSV band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRange {
    pub name: String,
    pub range: HsvRange,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self {
            name: name.into(),
            range: HsvRange::new(lower, upper),
        }
    }
}

/// The stock bands for brightly colored pads.
pub fn default_color_table() -> Vec<NamedRange> {
    vec![
        NamedRange::new("lime", [38, 80, 80], [75, 255, 255]),
        NamedRange::new("green", [30, 60, 60], [85, 255, 255]),
        NamedRange::new("yellow", [20, 120, 120], [35, 255, 255]),
        NamedRange::new("magenta", [140, 80, 80], [175, 255, 255]),
        NamedRange::new("blue", [95, 80, 80], [130, 255, 255]),
        NamedRange::new("orange", [5, 120, 120], [20, 255, 255]),
        NamedRange::new("cyan", [80, 80, 80], [100, 255, 255]),
    ]
}

/// Configuration of the color detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorDetectorParams {
    /// HSV bands to scan, in order.
    pub colors: Vec<NamedRange>,
    /// Accepted contour area in px^2.
    pub min_area: f64,
    pub max_area: f64,
    /// Accepted width/height ratio of the bounding rectangle.
    pub aspect_min: f32,
    pub aspect_max: f32,
    /// Contour area over convex-hull area; rejects concave or fragmented
    /// blobs that are unlikely to be one coherent pad.
    pub solidity_min: f64,
    /// Pre-threshold box blur kernel (odd; <= 1 disables).
    pub blur_kernel: usize,
    /// Structuring-element size for mask cleanup.
    pub morph_kernel: usize,
    /// Polygon simplification: epsilon as a fraction of the perimeter.
    pub simplify_epsilon_frac: f64,
    #[serde(default)]
    pub style: DrawStyle,
}

impl Default for ColorDetectorParams {
    fn default() -> Self {
        Self {
            colors: default_color_table(),
            min_area: 800.0,
            max_area: 1_000_000.0,
            aspect_min: 0.5,
            aspect_max: 2.2,
            solidity_min: 0.85,
            blur_kernel: 3,
            morph_kernel: 5,
            simplify_epsilon_frac: 0.01,
            style: DrawStyle::default(),
        }
    }
}
