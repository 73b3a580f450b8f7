//! Reference templates and the bank that owns them for a session.

use log::{info, warn};

use refpad_core::{Frame, GrayImage};
use refpad_features::{preprocess_for_keypoints, Descriptor, FeatureExtractor, Keypoint};

use crate::shape::ShapeSignature;

/// A reference with fewer keypoints than this cannot be matched reliably.
pub const MIN_REFERENCE_KEYPOINTS: usize = 8;

/// Errors raised while building the reference bank. Fatal at session start
/// when a keypoint-based mode was requested.
#[derive(thiserror::Error, Debug)]
pub enum ReferenceLoadError {
    #[error("failed to read reference image {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("reference '{name}' has too little texture ({found} keypoints, need {MIN_REFERENCE_KEYPOINTS})")]
    TooFewKeypoints { name: String, found: usize },
    #[error("none of the {attempted} reference images could be loaded")]
    AllFailed { attempted: usize },
}

/// One immutable reference template.
///
/// Built once at load time; the bank hands out shared borrows for the rest
/// of the session.
#[derive(Clone, Debug)]
pub struct Reference {
    pub name: String,
    pub frame: Frame,
    pub gray: GrayImage,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
    pub width: usize,
    pub height: usize,
    pub signature: Option<ShapeSignature>,
}

impl Reference {
    /// Extract keypoints, descriptors and the shape signature from a decoded
    /// frame. Fails when the image yields fewer than
    /// [`MIN_REFERENCE_KEYPOINTS`] keypoints.
    pub fn from_frame(
        name: impl Into<String>,
        frame: Frame,
        extractor: &FeatureExtractor,
    ) -> Result<Self, ReferenceLoadError> {
        let name = name.into();
        let preprocessed = preprocess_for_keypoints(&frame);
        let (keypoints, descriptors) = extractor.detect_and_describe(&preprocessed);
        if keypoints.len() < MIN_REFERENCE_KEYPOINTS {
            return Err(ReferenceLoadError::TooFewKeypoints {
                name,
                found: keypoints.len(),
            });
        }

        let gray = frame.to_gray();
        let signature = ShapeSignature::from_gray(&gray);
        if signature.is_none() {
            warn!("reference '{name}': no edge contour found, shape pre-filter disabled for it");
        }

        let (width, height) = (frame.width, frame.height);
        Ok(Self {
            name,
            frame,
            gray,
            keypoints,
            descriptors,
            width,
            height,
            signature,
        })
    }
}

/// All references for one session. Populated once, read-only afterwards.
#[derive(Clone, Debug)]
pub struct ReferenceBank {
    references: Vec<Reference>,
}

impl ReferenceBank {
    pub fn single(reference: Reference) -> Self {
        Self {
            references: vec![reference],
        }
    }

    /// Load several references independently. Failures are skipped with a
    /// warning; the bank fails only when every load fails.
    pub fn from_frames(
        frames: impl IntoIterator<Item = (String, Frame)>,
        extractor: &FeatureExtractor,
    ) -> Result<Self, ReferenceLoadError> {
        let mut references = Vec::new();
        let mut attempted = 0usize;
        for (name, frame) in frames {
            attempted += 1;
            match Reference::from_frame(name.clone(), frame, extractor) {
                Ok(r) => {
                    info!("loaded reference '{}' ({} keypoints)", r.name, r.keypoints.len());
                    references.push(r);
                }
                Err(e) => warn!("skipping reference '{name}': {e}"),
            }
        }
        if references.is_empty() {
            return Err(ReferenceLoadError::AllFailed { attempted });
        }
        Ok(Self { references })
    }

    /// First successfully loaded reference, for single-reference callers.
    #[inline]
    pub fn primary(&self) -> &Reference {
        &self.references[0]
    }

    #[inline]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refpad_features::FeatureParams;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureParams::default())
    }

    /// Deterministic blocky texture with plenty of corners.
    fn textured_frame(w: usize, h: usize, seed: u64) -> Frame {
        let mut f = Frame::new(w, h);
        let mut state = seed;
        let block = 10;
        for by in 0..h.div_ceil(block) {
            for bx in 0..w.div_ceil(block) {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let v = ((state >> 33) % 256) as u8;
                for y in by * block..((by + 1) * block).min(h) {
                    for x in bx * block..((bx + 1) * block).min(w) {
                        f.set_rgb(x, y, [v, v, v]);
                    }
                }
            }
        }
        f
    }

    #[test]
    fn textured_reference_loads() {
        let r = Reference::from_frame("pad", textured_frame(140, 140, 3), &extractor()).unwrap();
        assert!(r.keypoints.len() >= MIN_REFERENCE_KEYPOINTS);
        assert_eq!(r.keypoints.len(), r.descriptors.len());
        assert_eq!(r.width, 140);
    }

    #[test]
    fn flat_reference_is_rejected() {
        let err = Reference::from_frame("flat", Frame::filled(120, 120, [128, 128, 128]), &extractor())
            .unwrap_err();
        match err {
            ReferenceLoadError::TooFewKeypoints { found, .. } => assert!(found < 8),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bank_skips_failures_and_keeps_order() {
        let ext = extractor();
        let bank = ReferenceBank::from_frames(
            [
                ("first".to_string(), textured_frame(120, 120, 1)),
                ("flat".to_string(), Frame::filled(100, 100, [50, 50, 50])),
                ("third".to_string(), textured_frame(120, 120, 2)),
            ],
            &ext,
        )
        .unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.primary().name, "first");
    }

    #[test]
    fn bank_fails_when_all_fail() {
        let ext = extractor();
        let err = ReferenceBank::from_frames(
            [("a".to_string(), Frame::filled(64, 64, [0, 0, 0]))],
            &ext,
        )
        .unwrap_err();
        match err {
            ReferenceLoadError::AllFailed { attempted } => assert_eq!(attempted, 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
