use serde::{Deserialize, Serialize};

use refpad_core::{DrawStyle, RansacParams};
use refpad_features::FeatureParams;

use crate::proposer::ProposerParams;

/// Matching and pose-acceptance thresholds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MatchParams {
    /// Flat good-match floor for whole-frame matching, and the base of the
    /// adaptive floor for region matching.
    pub min_matches: usize,
    /// Lowe ratio: best distance must be below `ratio * second_best`.
    pub ratio_threshold: f32,
    /// Region matching demands `max(min_matches, frac * rect perimeter)`
    /// good matches, so larger regions need proportionally more evidence.
    pub adaptive_perimeter_frac: f32,
    /// Robust pose fit settings (reprojection tolerance in px).
    pub ransac: RansacParams,
    /// Hu-moment log-distance gate of the shape pre-filter.
    ///
    /// Empirically chosen default; tune against representative footage
    /// rather than trusting it blindly.
    pub shape_distance_max: f64,
    /// Minimum IoU between the projected quad and the region rectangle.
    /// Guards against fits anchored outside the proposed region. Same
    /// caveat as `shape_distance_max`.
    pub region_iou_min: f32,
    /// Frames or regions with fewer keypoints than this are not matched.
    pub min_frame_keypoints: usize,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            min_matches: 18,
            ratio_threshold: 0.75,
            adaptive_perimeter_frac: 0.02,
            ransac: RansacParams::default(),
            shape_distance_max: 6.0,
            region_iou_min: 0.3,
            min_frame_keypoints: 8,
        }
    }
}

/// Complete configuration of the keypoint detector.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PadDetectorParams {
    #[serde(default)]
    pub features: FeatureParams,
    #[serde(default)]
    pub matching: MatchParams,
    #[serde(default)]
    pub proposer: ProposerParams,
    #[serde(default)]
    pub style: DrawStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let p = MatchParams::default();
        assert_eq!(p.min_matches, 18);
        assert!((p.ratio_threshold - 0.75).abs() < f32::EPSILON);
        assert!((p.ransac.reproj_tol - 5.0).abs() < f32::EPSILON);
        assert!((p.shape_distance_max - 6.0).abs() < f64::EPSILON);
        assert!((p.region_iou_min - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn params_deserialize_with_partial_overrides() {
        let p: PadDetectorParams =
            serde_json::from_str(r#"{"matching": {"min_matches": 24, "ratio_threshold": 0.8, "adaptive_perimeter_frac": 0.02, "ransac": {"reproj_tol": 4.0, "max_iters": 128, "seed": 1}, "shape_distance_max": 5.0, "region_iou_min": 0.4, "min_frame_keypoints": 8}}"#)
                .unwrap();
        assert_eq!(p.matching.min_matches, 24);
        assert_eq!(p.features.feature_count, 2000);
    }
}
