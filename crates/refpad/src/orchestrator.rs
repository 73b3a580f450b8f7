//! Mode selection and the auto-fallback policy.
//!
//! Keypoint matching identifies *the specific* reference instance and is
//! authoritative when it succeeds; color segmentation only identifies *some*
//! object of a configured color class and acts as a lower-specificity
//! fallback. `Auto` encodes exactly that ordering.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use refpad_color::{ColorDetection, ColorDetector};
use refpad_core::{Frame, GrayImage};
use refpad_keypoint::{PadDetection, PadDetector};

/// Requested detection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    Keypoint,
    Color,
    Auto,
}

impl FromStr for DetectorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keypoint" => Ok(Self::Keypoint),
            "color" => Ok(Self::Color),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown detector mode '{other}' (expected keypoint, color or auto)"
            )),
        }
    }
}

impl std::fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Keypoint => "keypoint",
            Self::Color => "color",
            Self::Auto => "auto",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    #[error("mode '{mode}' needs at least one loaded reference")]
    NoReferences { mode: DetectorMode },
}

/// Result of one orchestrated frame: whichever pipeline produced the answer.
#[derive(Clone, Debug)]
pub enum ModeResult {
    Keypoint(PadDetection),
    Color(ColorDetection),
}

impl ModeResult {
    #[inline]
    pub fn frame(&self) -> &Frame {
        match self {
            Self::Keypoint(r) => &r.frame,
            Self::Color(r) => &r.frame,
        }
    }

    #[inline]
    pub fn mask(&self) -> Option<&GrayImage> {
        match self {
            Self::Keypoint(r) => r.mask.as_ref(),
            Self::Color(r) => r.mask.as_ref(),
        }
    }

    #[inline]
    pub fn has_detection(&self) -> bool {
        match self {
            Self::Keypoint(r) => r.has_detection,
            Self::Color(r) => r.has_detection(),
        }
    }

    /// Match count for the keypoint path, detection count for the color path.
    #[inline]
    pub fn count(&self) -> usize {
        match self {
            Self::Keypoint(r) => r.matches_found,
            Self::Color(r) => r.total_detections,
        }
    }
}

/// Routes frames to the two pipelines according to the requested mode.
/// Pure per frame: no state is carried between calls.
pub struct Orchestrator {
    keypoint: Option<PadDetector>,
    color: ColorDetector,
}

impl Orchestrator {
    pub fn new(keypoint: PadDetector, color: ColorDetector) -> Self {
        Self {
            keypoint: Some(keypoint),
            color,
        }
    }

    /// An orchestrator without references; only [`DetectorMode::Color`] works.
    pub fn color_only(color: ColorDetector) -> Self {
        Self {
            keypoint: None,
            color,
        }
    }

    #[inline]
    pub fn keypoint_detector(&self) -> Option<&PadDetector> {
        self.keypoint.as_ref()
    }

    #[inline]
    pub fn color_detector(&self) -> &ColorDetector {
        &self.color
    }

    pub fn detect(
        &self,
        frame: &Frame,
        mode: DetectorMode,
    ) -> Result<ModeResult, OrchestratorError> {
        match mode {
            DetectorMode::Keypoint => {
                let detector = self.require_keypoint(mode)?;
                Ok(ModeResult::Keypoint(detector.detect_in_frame(frame)))
            }
            DetectorMode::Color => Ok(ModeResult::Color(self.color.detect_in_frame(frame))),
            DetectorMode::Auto => {
                let detector = self.require_keypoint(mode)?;
                let keypoint_result = detector.detect_in_frame(frame);
                if keypoint_result.has_detection {
                    // Authoritative hit: the color detector is not consulted.
                    return Ok(ModeResult::Keypoint(keypoint_result));
                }
                let color_result = self.color.detect_in_frame(frame);
                if color_result.has_detection() {
                    return Ok(ModeResult::Color(color_result));
                }
                // Both missed: keep the keypoint result so the match count
                // stays available for diagnostics.
                Ok(ModeResult::Keypoint(keypoint_result))
            }
        }
    }

    fn require_keypoint(&self, mode: DetectorMode) -> Result<&PadDetector, OrchestratorError> {
        self.keypoint
            .as_ref()
            .ok_or(OrchestratorError::NoReferences { mode })
    }
}
