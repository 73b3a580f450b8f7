//! End-to-end checks on synthetic frames: an exact copy of the reference
//! pasted at a known offset must come back as a quad at that offset.

use refpad_core::Frame;
use refpad_features::{FeatureExtractor, FeatureParams};
use refpad_keypoint::{PadDetector, PadDetectorParams, Reference, ReferenceBank};

fn lcg(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

/// Gray block noise: zero saturation, lots of corners.
fn gray_texture(w: usize, h: usize, seed: u64) -> Frame {
    let mut f = Frame::new(w, h);
    let mut state = seed;
    let block = 10;
    for by in 0..h.div_ceil(block) {
        for bx in 0..w.div_ceil(block) {
            let v = (lcg(&mut state) % 256) as u8;
            for y in by * block..((by + 1) * block).min(h) {
                for x in bx * block..((bx + 1) * block).min(w) {
                    f.set_rgb(x, y, [v, v, v]);
                }
            }
        }
    }
    f
}

/// Saturated color block noise for the region-proposal path.
fn color_texture(w: usize, h: usize, seed: u64) -> Frame {
    const PALETTE: [[u8; 3]; 6] = [
        [230, 40, 40],
        [40, 230, 40],
        [40, 40, 230],
        [230, 230, 40],
        [230, 40, 230],
        [40, 230, 230],
    ];
    let mut f = Frame::new(w, h);
    let mut state = seed;
    let block = 10;
    for by in 0..h.div_ceil(block) {
        for bx in 0..w.div_ceil(block) {
            let c = PALETTE[(lcg(&mut state) % PALETTE.len() as u64) as usize];
            for y in by * block..((by + 1) * block).min(h) {
                for x in bx * block..((bx + 1) * block).min(w) {
                    f.set_rgb(x, y, c);
                }
            }
        }
    }
    f
}

fn paste(dst: &mut Frame, src: &Frame, x0: usize, y0: usize) {
    for y in 0..src.height {
        for x in 0..src.width {
            dst.set_rgb(x0 + x, y0 + y, src.rgb_at(x, y));
        }
    }
}

fn detector_for(reference_frame: Frame) -> PadDetector {
    let params = PadDetectorParams::default();
    let extractor = FeatureExtractor::new(params.features);
    let reference = Reference::from_frame("pad", reference_frame, &extractor).expect("reference");
    PadDetector::new(ReferenceBank::single(reference), params)
}

#[test]
fn whole_frame_roundtrip_recovers_offset() {
    let reference_frame = gray_texture(140, 140, 11);
    let (dx, dy) = (150.0f32, 90.0f32);

    let mut scene = Frame::filled(360, 280, [120, 120, 120]);
    paste(&mut scene, &reference_frame, dx as usize, dy as usize);

    let detector = detector_for(reference_frame);
    let result = detector.detect_in_frame(&scene);

    assert!(result.has_detection, "matches: {}", result.matches_found);
    assert!(result.matches_found >= detector.params().matching.min_matches);

    let corners = result.corners.expect("projected corners");
    let expected = [
        (dx, dy),
        (dx + 140.0, dy),
        (dx + 140.0, dy + 140.0),
        (dx, dy + 140.0),
    ];
    for (corner, (ex, ey)) in corners.iter().zip(expected) {
        assert!(
            (corner.x - ex).abs() < 3.0 && (corner.y - ey).abs() < 3.0,
            "corner ({}, {}) expected near ({ex}, {ey})",
            corner.x,
            corner.y
        );
    }

    let mask = result.mask.expect("occupancy mask");
    assert_eq!(mask.width, scene.width);
    assert_eq!(mask.at(220, 160), 255, "quad interior covered");
    assert_eq!(mask.at(20, 20), 0, "background clear");
}

#[test]
fn region_path_detects_saturated_pad() {
    let reference_frame = color_texture(140, 140, 23);
    let (dx, dy) = (100usize, 70usize);

    let mut scene = Frame::filled(360, 280, [40, 40, 40]);
    paste(&mut scene, &reference_frame, dx, dy);

    let detector = detector_for(reference_frame);
    let result = detector.detect_in_frame(&scene);

    assert!(result.has_detection, "matches: {}", result.matches_found);
    let corners = result.corners.expect("projected corners");
    assert!(
        (corners[0].x - dx as f32).abs() < 5.0 && (corners[0].y - dy as f32).abs() < 5.0,
        "corner 0 at ({}, {})",
        corners[0].x,
        corners[0].y
    );
    assert!(result.mask.is_some());
}

#[test]
fn empty_scene_is_a_clean_miss() {
    let reference_frame = gray_texture(140, 140, 31);
    let detector = detector_for(reference_frame);

    let scene = Frame::filled(320, 240, [128, 128, 128]);
    let result = detector.detect_in_frame(&scene);

    assert!(!result.has_detection);
    assert!(result.mask.is_none());
    assert!(result.homography.is_none());
    assert_eq!(result.frame, scene, "miss must leave the frame unpainted");
}

#[test]
fn unrelated_texture_does_not_fake_a_hit() {
    let reference_frame = gray_texture(140, 140, 41);
    let detector = detector_for(reference_frame);

    // Different seed: plenty of keypoints, none of them the reference.
    let scene = gray_texture(320, 240, 1234);
    let result = detector.detect_in_frame(&scene);

    assert!(!result.has_detection, "matches: {}", result.matches_found);
}

#[test]
fn detector_counts_runs() {
    let detector = detector_for(gray_texture(140, 140, 51));
    assert_eq!(detector.runs(), 0);
    let scene = Frame::filled(160, 120, [90, 90, 90]);
    let _ = detector.detect_in_frame(&scene);
    let _ = detector.detect_in_frame(&scene);
    assert_eq!(detector.runs(), 2);
}
