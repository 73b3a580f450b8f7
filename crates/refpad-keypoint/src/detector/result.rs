use nalgebra::Point2;

use refpad_core::{Frame, GrayImage, Homography};

/// Per-frame outcome of the keypoint pipeline.
///
/// A frame with no hit is still a valid result: `has_detection` is false and
/// `matches_found` keeps the best below-threshold count for diagnostics.
#[derive(Clone, Debug)]
pub struct PadDetection {
    /// Input frame with the accepted quad painted on it (untouched copy when
    /// nothing was accepted).
    pub frame: Frame,
    /// Occupancy mask of the projected quad, full frame size.
    pub mask: Option<GrayImage>,
    /// Best good-match count seen across candidates and references.
    pub matches_found: usize,
    pub has_detection: bool,
    /// Accepted projective transform (reference coords to the matched
    /// coordinate system).
    pub homography: Option<Homography>,
    /// Projected reference corners in frame coordinates.
    pub corners: Option<[Point2<f32>; 4]>,
}

impl PadDetection {
    pub(crate) fn miss(frame: Frame, matches_found: usize) -> Self {
        Self {
            frame,
            mask: None,
            matches_found,
            has_detection: false,
            homography: None,
            corners: None,
        }
    }
}
