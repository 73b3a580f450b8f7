//! The owned feature backend handle.

use serde::{Deserialize, Serialize};

use refpad_core::GrayImage;

use crate::brief::{describe, patch_orientation, BriefPattern, PATCH_MARGIN};
use crate::fast::detect_fast;

pub(crate) const DESCRIPTOR_BYTES: usize = 32;

/// One detected corner with its patch orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
    pub angle: f32,
}

/// 256-bit binary descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor(pub [u8; DESCRIPTOR_BYTES]);

impl Descriptor {
    /// Hamming distance.
    #[inline]
    pub fn distance(&self, other: &Descriptor) -> u32 {
        let mut d = 0u32;
        for i in 0..DESCRIPTOR_BYTES {
            d += (self.0[i] ^ other.0[i]).count_ones();
        }
        d
    }
}

/// Extraction settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Keep at most this many keypoints (strongest first).
    pub feature_count: usize,
    /// FAST segment-test threshold on 0..255 intensities.
    pub fast_threshold: u8,
    /// Seed for the BRIEF sampling pattern.
    #[serde(default = "default_pattern_seed")]
    pub pattern_seed: u64,
}

fn default_pattern_seed() -> u64 {
    0x1234_5678_9abc_def0
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            feature_count: 2000,
            fast_threshold: 20,
            pattern_seed: default_pattern_seed(),
        }
    }
}

/// Keypoint extractor owning its sampling pattern.
///
/// Construct once per detector; extraction itself is stateless and can be
/// reused across frames.
#[derive(Clone, Debug)]
pub struct FeatureExtractor {
    params: FeatureParams,
    pattern: BriefPattern,
}

impl FeatureExtractor {
    pub fn new(params: FeatureParams) -> Self {
        let pattern = BriefPattern::generate(params.pattern_seed);
        Self { params, pattern }
    }

    #[inline]
    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Detect corners and describe them in one pass.
    pub fn detect_and_describe(&self, img: &GrayImage) -> (Vec<Keypoint>, Vec<Descriptor>) {
        let mut kps = detect_fast(
            img,
            self.params.fast_threshold,
            PATCH_MARGIN,
            self.params.feature_count,
        );
        let mut descriptors = Vec::with_capacity(kps.len());
        for kp in kps.iter_mut() {
            kp.angle = patch_orientation(img, kp.x as i32, kp.y as i32);
            descriptors.push(describe(img, kp, &self.pattern));
        }
        (kps, descriptors)
    }
}
