//! Region proposals from saturation segmentation.

use serde::{Deserialize, Serialize};

use refpad_core::{
    bounding_rect, close, contour_area, contour_perimeter, find_external_contours,
    saturation_mask, to_hsv, Contour, Frame, Rect, StructKernel,
};

/// One plausible pad region in a frame. Ephemeral: consumed by the shape
/// pre-filter and matcher, then dropped.
#[derive(Clone, Debug)]
pub struct CandidateRegion {
    pub rect: Rect,
    pub contour: Contour,
}

/// Saturation and contour-geometry thresholds for region proposal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProposerParams {
    /// Accepted saturation band; the pad is a brightly colored object.
    pub saturation_min: u8,
    pub saturation_max: u8,
    /// Structuring-element size for the fragment-merging closing.
    pub morph_kernel: usize,
    pub morph_iterations: usize,
    /// Minimum contour area in px^2.
    pub min_area: f64,
    /// Accepted width/height ratio of the bounding rectangle.
    pub aspect_min: f32,
    pub aspect_max: f32,
    /// Accepted circularity band `4*pi*A / P^2`; rejects both near-perfect
    /// discs and ragged blobs.
    pub circularity_min: f64,
    pub circularity_max: f64,
}

impl Default for ProposerParams {
    fn default() -> Self {
        Self {
            saturation_min: 90,
            saturation_max: 255,
            morph_kernel: 5,
            morph_iterations: 2,
            min_area: 800.0,
            aspect_min: 0.5,
            aspect_max: 2.0,
            circularity_min: 0.55,
            circularity_max: 0.95,
        }
    }
}

/// Segment the frame by saturation and keep contours that look pad-like.
/// Order of the result is not significant.
pub fn propose_regions(frame: &Frame, params: &ProposerParams) -> Vec<CandidateRegion> {
    let hsv = to_hsv(frame);
    let mask = saturation_mask(&hsv, params.saturation_min, params.saturation_max);
    let mask = close(
        &mask,
        &StructKernel::ellipse(params.morph_kernel),
        params.morph_iterations,
    );

    let mut regions = Vec::new();
    for contour in find_external_contours(&mask) {
        let area = contour_area(&contour);
        if area < params.min_area {
            continue;
        }
        let rect = bounding_rect(&contour);
        let aspect = rect.aspect_ratio();
        if aspect < params.aspect_min || aspect > params.aspect_max {
            continue;
        }
        let perimeter = contour_perimeter(&contour);
        if perimeter <= 0.0 {
            continue;
        }
        let circularity = 4.0 * std::f64::consts::PI * area / (perimeter * perimeter);
        if circularity < params.circularity_min || circularity > params.circularity_max {
            continue;
        }
        regions.push(CandidateRegion { rect, contour });
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_square(side: usize) -> Frame {
        let mut f = Frame::filled(200, 160, [40, 40, 40]);
        for y in 40..40 + side {
            for x in 60..60 + side {
                f.set_rgb(x, y, [230, 40, 200]); // strongly saturated
            }
        }
        f
    }

    #[test]
    fn saturated_square_is_proposed() {
        let regions = propose_regions(&frame_with_square(48), &ProposerParams::default());
        assert_eq!(regions.len(), 1);
        let r = &regions[0].rect;
        assert!((r.x - 60).abs() <= 2 && (r.y - 40).abs() <= 2);
        assert!((r.w - 48).abs() <= 4 && (r.h - 48).abs() <= 4);
    }

    #[test]
    fn small_blob_is_rejected() {
        // 20x20 = 400 px^2, below the 800 px^2 floor.
        let regions = propose_regions(&frame_with_square(20), &ProposerParams::default());
        assert!(regions.is_empty());
    }

    #[test]
    fn elongated_blob_is_rejected() {
        let mut f = Frame::filled(240, 120, [40, 40, 40]);
        for y in 50..70 {
            for x in 20..220 {
                f.set_rgb(x, y, [230, 40, 200]);
            }
        }
        assert!(propose_regions(&f, &ProposerParams::default()).is_empty());
    }

    #[test]
    fn unsaturated_frame_yields_nothing() {
        let f = Frame::filled(160, 120, [150, 150, 150]);
        assert!(propose_regions(&f, &ProposerParams::default()).is_empty());
    }

    #[test]
    fn ragged_cross_is_rejected() {
        // A thin plus shape: square bounding box and enough area, but far too
        // much perimeter for its area.
        let mut f = Frame::filled(200, 200, [40, 40, 40]);
        for y in 97..103 {
            for x in 60..140 {
                f.set_rgb(x, y, [230, 40, 200]);
            }
        }
        for y in 60..140 {
            for x in 97..103 {
                f.set_rgb(x, y, [230, 40, 200]);
            }
        }
        assert!(propose_regions(&f, &ProposerParams::default()).is_empty());
    }
}
