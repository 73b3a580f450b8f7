//! Steered BRIEF-256 descriptors.
//!
//! The sampling pattern is generated once per extractor from a fixed seed, so
//! descriptors are comparable across processes without shipping a table.

use refpad_core::GrayImage;

use crate::extractor::{Descriptor, Keypoint, DESCRIPTOR_BYTES};

pub(crate) const PATTERN_PAIRS: usize = DESCRIPTOR_BYTES * 8;
pub(crate) const PATTERN_RADIUS: i32 = 13;
/// Keypoints must stay this far from the border so every rotated sample
/// lands inside the image.
pub(crate) const PATCH_MARGIN: usize = 16;

const ORIENTATION_RADIUS: i32 = 7;
const ANGLE_BINS: usize = 32;

#[derive(Clone, Debug)]
pub(crate) struct BriefPattern {
    pairs: Vec<((i32, i32), (i32, i32))>,
}

#[inline]
fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

impl BriefPattern {
    pub(crate) fn generate(seed: u64) -> Self {
        let mut state = seed;
        let mut draw = |state: &mut u64| -> (i32, i32) {
            loop {
                let span = (2 * PATTERN_RADIUS + 1) as u64;
                let x = (lcg_next(state) % span) as i32 - PATTERN_RADIUS;
                let y = (lcg_next(state) % span) as i32 - PATTERN_RADIUS;
                if x * x + y * y <= PATTERN_RADIUS * PATTERN_RADIUS {
                    return (x, y);
                }
            }
        };

        let mut pairs = Vec::with_capacity(PATTERN_PAIRS);
        while pairs.len() < PATTERN_PAIRS {
            let a = draw(&mut state);
            let b = draw(&mut state);
            if a != b {
                pairs.push((a, b));
            }
        }
        Self { pairs }
    }
}

/// Intensity-centroid orientation of the patch around (x, y).
pub(crate) fn patch_orientation(img: &GrayImage, x: i32, y: i32) -> f32 {
    let w = img.width as i32;
    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
                continue;
            }
            let v = img.data[((y + dy) * w + (x + dx)) as usize] as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

/// Describe one keypoint. The pattern is steered by the keypoint angle
/// quantized to 32 bins, which keeps equal patches bit-identical under
/// small orientation noise.
pub(crate) fn describe(
    img: &GrayImage,
    kp: &Keypoint,
    pattern: &BriefPattern,
) -> Descriptor {
    let bin = ((kp.angle.rem_euclid(std::f32::consts::TAU)) / std::f32::consts::TAU
        * ANGLE_BINS as f32)
        .floor() as usize
        % ANGLE_BINS;
    let theta = bin as f32 / ANGLE_BINS as f32 * std::f32::consts::TAU;
    let (sin, cos) = theta.sin_cos();

    let w = img.width as i32;
    let (cx, cy) = (kp.x as i32, kp.y as i32);
    let sample = |(px, py): (i32, i32)| -> u8 {
        let rx = (px as f32 * cos - py as f32 * sin).round() as i32;
        let ry = (px as f32 * sin + py as f32 * cos).round() as i32;
        img.data[((cy + ry) * w + (cx + rx)) as usize]
    };

    let mut bytes = [0u8; DESCRIPTOR_BYTES];
    for (i, &(a, b)) in pattern.pairs.iter().enumerate() {
        if sample(a) < sample(b) {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    Descriptor(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise_image(w: usize, h: usize, seed: u64) -> GrayImage {
        let mut state = seed;
        let mut img = GrayImage::new(w, h);
        for v in img.data.iter_mut() {
            *v = (lcg_next(&mut state) % 256) as u8;
        }
        img
    }

    #[test]
    fn pattern_is_deterministic() {
        let a = BriefPattern::generate(7);
        let b = BriefPattern::generate(7);
        assert_eq!(a.pairs, b.pairs);
        assert_eq!(a.pairs.len(), PATTERN_PAIRS);
    }

    #[test]
    fn identical_patches_give_identical_descriptors() {
        let src = noise_image(48, 48, 99);
        // Copy the same content into a second image at the same position.
        let dst = src.clone();
        let pattern = BriefPattern::generate(7);
        let kp = Keypoint {
            x: 24.0,
            y: 24.0,
            score: 1.0,
            angle: patch_orientation(&src, 24, 24),
        };
        let d1 = describe(&src, &kp, &pattern);
        let d2 = describe(&dst, &kp, &pattern);
        assert_eq!(d1.distance(&d2), 0);
    }

    #[test]
    fn different_patches_are_far_apart() {
        let a = noise_image(48, 48, 1);
        let b = noise_image(48, 48, 2);
        let pattern = BriefPattern::generate(7);
        let kp = Keypoint {
            x: 24.0,
            y: 24.0,
            score: 1.0,
            angle: 0.0,
        };
        let d = describe(&a, &kp, &pattern).distance(&describe(&b, &kp, &pattern));
        assert!(d > 60, "random patches should differ, distance {d}");
    }
}
