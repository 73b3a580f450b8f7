use std::cell::Cell;

use log::debug;
use nalgebra::Point2;

use refpad_core::{
    draw_polygon, fill_polygon, poly_rect_iou, project_reference_corners, ransac_homography,
    Frame, GrayImage, Homography, Rect,
};
use refpad_features::{
    knn_ratio_matches, preprocess_for_keypoints, Descriptor, FeatureExtractor, Keypoint,
};

use super::{MatchParams, PadDetection, PadDetectorParams};
use crate::bank::{Reference, ReferenceBank};
use crate::proposer::propose_regions;
use crate::shape::ShapeSignature;

/// Keypoint-matching pad detector.
///
/// Owns the reference bank and the feature backend for the session; a
/// detection call has no side effects beyond the invocation counter.
pub struct PadDetector {
    bank: ReferenceBank,
    params: PadDetectorParams,
    extractor: FeatureExtractor,
    runs: Cell<u64>,
}

/// One matching attempt against a single reference.
pub(crate) struct MatchAttempt {
    pub good_matches: usize,
    pub accepted: Option<AcceptedFit>,
}

pub(crate) struct AcceptedFit {
    pub homography: Homography,
    /// Corners in frame coordinates (region offset already applied).
    pub corners: [Point2<f32>; 4],
}

impl PadDetector {
    pub fn new(bank: ReferenceBank, params: PadDetectorParams) -> Self {
        let extractor = FeatureExtractor::new(params.features);
        Self {
            bank,
            params,
            extractor,
            runs: Cell::new(0),
        }
    }

    #[inline]
    pub fn bank(&self) -> &ReferenceBank {
        &self.bank
    }

    #[inline]
    pub fn params(&self) -> &PadDetectorParams {
        &self.params
    }

    /// How many frames this detector has processed. Lets callers verify
    /// orchestration ordering without instrumenting internals.
    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// Detect the pad in one frame: propose regions, pre-filter by shape,
    /// match and validate pose; fall back to whole-frame matching when no
    /// region qualifies. Keeps the single best fit by good-match count.
    pub fn detect_in_frame(&self, frame: &Frame) -> PadDetection {
        self.runs.set(self.runs.get() + 1);
        let candidates = propose_regions(frame, &self.params.proposer);
        if candidates.is_empty() {
            debug!("no candidate regions, scanning whole frame");
            return self.detect_whole_frame(frame);
        }

        let matching = &self.params.matching;
        let mut best_matches = 0usize;
        let mut best: Option<(usize, AcceptedFit)> = None;

        for candidate in &candidates {
            let rect = candidate.rect;
            let roi = frame.crop(
                rect.x.max(0) as usize,
                rect.y.max(0) as usize,
                rect.w as usize,
                rect.h as usize,
            );
            let preprocessed = preprocess_for_keypoints(&roi);
            let (keypoints, descriptors) = self.extractor.detect_and_describe(&preprocessed);
            if keypoints.len() < matching.min_frame_keypoints {
                continue;
            }
            let roi_signature = ShapeSignature::from_gray(&roi.to_gray());

            for reference in self.bank.references() {
                if let (Some(ref_sig), Some(roi_sig)) = (&reference.signature, &roi_signature) {
                    let d = ref_sig.distance(roi_sig);
                    if d > matching.shape_distance_max {
                        debug!(
                            "shape gate skips '{}' for region at ({}, {}): distance {:.2}",
                            reference.name, rect.x, rect.y, d
                        );
                        continue;
                    }
                }

                let attempt =
                    try_match(matching, reference, &keypoints, &descriptors, Some(rect));
                best_matches = best_matches.max(attempt.good_matches);
                if let Some(fit) = attempt.accepted {
                    let replace = best
                        .as_ref()
                        .map_or(true, |(count, _)| attempt.good_matches > *count);
                    if replace {
                        best = Some((attempt.good_matches, fit));
                    }
                }
            }
        }

        self.finish(frame, best, best_matches)
    }

    fn detect_whole_frame(&self, frame: &Frame) -> PadDetection {
        let matching = &self.params.matching;
        let preprocessed = preprocess_for_keypoints(frame);
        let (keypoints, descriptors) = self.extractor.detect_and_describe(&preprocessed);
        if keypoints.len() < matching.min_frame_keypoints {
            debug!("frame has only {} keypoints, reporting a miss", keypoints.len());
            return PadDetection::miss(frame.clone(), 0);
        }

        let mut best_matches = 0usize;
        let mut best: Option<(usize, AcceptedFit)> = None;
        for reference in self.bank.references() {
            let attempt = try_match(matching, reference, &keypoints, &descriptors, None);
            best_matches = best_matches.max(attempt.good_matches);
            if let Some(fit) = attempt.accepted {
                let replace = best
                    .as_ref()
                    .map_or(true, |(count, _)| attempt.good_matches > *count);
                if replace {
                    best = Some((attempt.good_matches, fit));
                }
            }
        }

        self.finish(frame, best, best_matches)
    }

    fn finish(
        &self,
        frame: &Frame,
        best: Option<(usize, AcceptedFit)>,
        best_matches: usize,
    ) -> PadDetection {
        let Some((good_matches, fit)) = best else {
            return PadDetection::miss(frame.clone(), best_matches);
        };

        let mut output = frame.clone();
        draw_polygon(&mut output, &fit.corners, &self.params.style);
        let mut mask = GrayImage::new(frame.width, frame.height);
        fill_polygon(&mut mask, &fit.corners, 255);

        PadDetection {
            frame: output,
            mask: Some(mask),
            matches_found: good_matches,
            has_detection: true,
            homography: Some(fit.homography),
            corners: Some(fit.corners),
        }
    }
}

/// Required good-match floor: flat for whole-frame matching, scaled by the
/// region perimeter otherwise.
pub(crate) fn required_matches(params: &MatchParams, region: Option<Rect>) -> usize {
    match region {
        Some(rect) => params
            .min_matches
            .max((params.adaptive_perimeter_frac * rect.perimeter()) as usize),
        None => params.min_matches,
    }
}

/// Match one reference against an extracted keypoint set, fit a pose and
/// validate it. `region` carries the rect when the keypoints came from a
/// cropped candidate; projected corners are then shifted to frame
/// coordinates and checked for overlap with the region.
pub(crate) fn try_match(
    params: &MatchParams,
    reference: &Reference,
    keypoints: &[Keypoint],
    descriptors: &[Descriptor],
    region: Option<Rect>,
) -> MatchAttempt {
    let matches = knn_ratio_matches(
        &reference.descriptors,
        descriptors,
        params.ratio_threshold,
    );
    let good_matches = matches.len();
    if good_matches < required_matches(params, region) {
        return MatchAttempt {
            good_matches,
            accepted: None,
        };
    }

    let src: Vec<Point2<f32>> = matches
        .iter()
        .map(|m| {
            let kp = &reference.keypoints[m.query];
            Point2::new(kp.x, kp.y)
        })
        .collect();
    let dst: Vec<Point2<f32>> = matches
        .iter()
        .map(|m| {
            let kp = &keypoints[m.train];
            Point2::new(kp.x, kp.y)
        })
        .collect();

    let Some((homography, _inliers)) = ransac_homography(&src, &dst, &params.ransac) else {
        return MatchAttempt {
            good_matches,
            accepted: None,
        };
    };

    let mut corners = project_reference_corners(&homography, reference.width, reference.height);
    if let Some(rect) = region {
        for corner in corners.iter_mut() {
            corner.x += rect.x as f32;
            corner.y += rect.y as f32;
        }
        let iou = poly_rect_iou(&corners, rect);
        if iou < params.region_iou_min {
            debug!(
                "pose for '{}' rejected: IoU {:.3} below {:.2}",
                reference.name, iou, params.region_iou_min
            );
            return MatchAttempt {
                good_matches,
                accepted: None,
            };
        }
    }

    MatchAttempt {
        good_matches,
        accepted: Some(AcceptedFit {
            homography,
            corners,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MIN_REFERENCE_KEYPOINTS;

    /// Build a reference with hand-made keypoints and unique descriptors so
    /// that matching is exact and fully controlled.
    fn synthetic_reference(count: usize) -> Reference {
        let mut keypoints = Vec::with_capacity(count);
        let mut descriptors = Vec::with_capacity(count);
        for i in 0..count {
            // 6x-grid with mild jitter to stay clear of degenerate samples.
            let gx = (i % 6) as f32 * 20.0 + (i as f32 * 0.7).sin() * 1.5;
            let gy = (i / 6) as f32 * 20.0 + (i as f32 * 1.3).cos() * 1.5;
            keypoints.push(Keypoint {
                x: gx + 10.0,
                y: gy + 10.0,
                score: 1.0,
                angle: 0.0,
            });
            let mut bytes = [0u8; 32];
            for b in 0..6 {
                let bit = (i * 6 + b) % 256;
                bytes[bit / 8] |= 1 << (bit % 8);
            }
            descriptors.push(Descriptor(bytes));
        }
        assert!(count >= MIN_REFERENCE_KEYPOINTS);
        Reference {
            name: "synthetic".into(),
            frame: Frame::new(140, 140),
            gray: GrayImage::new(140, 140),
            keypoints,
            descriptors,
            width: 140,
            height: 140,
            signature: None,
        }
    }

    /// Frame-side keypoints: the reference keypoints translated by (dx, dy).
    fn translated_scene(reference: &Reference, dx: f32, dy: f32) -> (Vec<Keypoint>, Vec<Descriptor>) {
        let kps = reference
            .keypoints
            .iter()
            .map(|kp| Keypoint {
                x: kp.x + dx,
                y: kp.y + dy,
                ..*kp
            })
            .collect();
        (kps, reference.descriptors.clone())
    }

    #[test]
    fn acceptance_is_monotonic_in_match_count() {
        let params = MatchParams {
            min_matches: 20,
            ..MatchParams::default()
        };

        // One below the floor: must fail regardless of geometry.
        let reference = synthetic_reference(19);
        let (kps, descs) = translated_scene(&reference, 30.0, 12.0);
        let attempt = try_match(&params, &reference, &kps, &descs, None);
        assert_eq!(attempt.good_matches, 19);
        assert!(attempt.accepted.is_none());

        // One above, geometrically consistent: must succeed.
        let reference = synthetic_reference(21);
        let (kps, descs) = translated_scene(&reference, 30.0, 12.0);
        let attempt = try_match(&params, &reference, &kps, &descs, None);
        assert_eq!(attempt.good_matches, 21);
        let fit = attempt.accepted.expect("fit above the floor");
        assert!((fit.corners[0].x - 30.0).abs() < 1.0);
        assert!((fit.corners[0].y - 12.0).abs() < 1.0);
    }

    #[test]
    fn spatially_inconsistent_fit_is_rejected_by_iou() {
        // Keypoints translate consistently (RANSAC succeeds), but the
        // region rect sits nowhere near the projected quad.
        let params = MatchParams {
            min_matches: 10,
            ..MatchParams::default()
        };
        let reference = synthetic_reference(30);
        let (kps, descs) = translated_scene(&reference, 400.0, 300.0);
        let region = Rect {
            x: 0,
            y: 0,
            w: 120,
            h: 120,
        };
        let attempt = try_match(&params, &reference, &kps, &descs, Some(region));
        assert_eq!(attempt.good_matches, 30);
        assert!(attempt.accepted.is_none(), "IoU gate should reject");

        // Same geometry without a region: accepted.
        let attempt = try_match(&params, &reference, &kps, &descs, None);
        assert!(attempt.accepted.is_some());
    }

    #[test]
    fn adaptive_floor_scales_with_region_perimeter() {
        let params = MatchParams {
            min_matches: 18,
            ..MatchParams::default()
        };
        let small = Rect {
            x: 0,
            y: 0,
            w: 100,
            h: 100,
        };
        let large = Rect {
            x: 0,
            y: 0,
            w: 800,
            h: 700,
        };
        assert_eq!(required_matches(&params, None), 18);
        assert_eq!(required_matches(&params, Some(small)), 18);
        // 0.02 * 2 * (800 + 700) = 60
        assert_eq!(required_matches(&params, Some(large)), 60);
    }
}
