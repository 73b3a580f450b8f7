//! End-to-end helpers bridging files and `image` buffers to the pipeline.

use std::path::{Path, PathBuf};

use log::warn;

use refpad_color::ColorDetector;
use refpad_core::{Frame, GrayImage};
use refpad_features::FeatureExtractor;
use refpad_keypoint::{PadDetector, Reference, ReferenceBank, ReferenceLoadError};

use crate::config::{AppConfig, ConfigError};
use crate::orchestrator::{DetectorMode, ModeResult, Orchestrator, OrchestratorError};
use crate::source::SourceOpenError;

/// Errors produced by the high-level helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceOpenError),
    #[error(transparent)]
    Reference(#[from] ReferenceLoadError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Convert a decoded RGB image into the pipeline frame type.
pub fn frame_from_image(img: &image::RgbImage) -> Frame {
    Frame {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

pub fn image_from_frame(frame: &Frame) -> image::RgbImage {
    image::RgbImage::from_raw(frame.width as u32, frame.height as u32, frame.data.clone())
        .expect("frame buffer length matches its dimensions")
}

pub fn gray_to_image(mask: &GrayImage) -> image::GrayImage {
    image::GrayImage::from_raw(mask.width as u32, mask.height as u32, mask.data.clone())
        .expect("mask buffer length matches its dimensions")
}

/// Read one image file into a frame.
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, SourceOpenError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SourceOpenError::NotFound {
            path: path.display().to_string(),
        });
    }
    let img = image::ImageReader::open(path)
        .map_err(|e| SourceOpenError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .decode()
        .map_err(|e| SourceOpenError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(frame_from_image(&img.to_rgb8()))
}

/// Load reference images into a bank. Unreadable files and low-texture
/// images are skipped with a warning; fails only when nothing loads.
pub fn load_reference_bank(
    paths: &[PathBuf],
    extractor: &FeatureExtractor,
) -> Result<ReferenceBank, ReferenceLoadError> {
    let mut loaded = Vec::new();
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let frame = match load_frame(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(
                    "skipping reference {}: {}",
                    path.display(),
                    ReferenceLoadError::Read {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }
                );
                continue;
            }
        };
        loaded.push((name, frame));
    }
    if loaded.is_empty() {
        return Err(ReferenceLoadError::AllFailed {
            attempted: paths.len(),
        });
    }
    ReferenceBank::from_frames(loaded, extractor)
}

/// Load a single reference, propagating every failure.
pub fn load_reference(
    path: impl AsRef<Path>,
    extractor: &FeatureExtractor,
) -> Result<Reference, ReferenceLoadError> {
    let path = path.as_ref();
    let frame = load_frame(path).map_err(|e| ReferenceLoadError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Reference::from_frame(name, frame, extractor)
}

/// Build an orchestrator for the configured mode. References are loaded
/// only when a keypoint-based mode asks for them.
pub fn build_orchestrator(
    config: &AppConfig,
    reference_paths: &[PathBuf],
) -> Result<Orchestrator, DetectError> {
    config.validate()?;
    let color = ColorDetector::new(config.color.clone());
    if config.mode == DetectorMode::Color {
        return Ok(Orchestrator::color_only(color));
    }
    let extractor = FeatureExtractor::new(config.detector.features);
    let bank = load_reference_bank(reference_paths, &extractor)?;
    let keypoint = PadDetector::new(bank, config.detector);
    Ok(Orchestrator::new(keypoint, color))
}

/// Flattened single-image outcome.
#[derive(Clone, Debug)]
pub struct ImageOutcome {
    pub frame: Frame,
    pub mask: Option<GrayImage>,
    pub has_detection: bool,
    /// Match count (keypoint path) or detection count (color path).
    pub count: usize,
}

/// One-call detection on a still image.
pub fn detect_image(
    source: impl AsRef<Path>,
    reference_paths: &[PathBuf],
    config: &AppConfig,
) -> Result<ImageOutcome, DetectError> {
    let orchestrator = build_orchestrator(config, reference_paths)?;
    let frame = load_frame(source)?;
    let result = orchestrator.detect(&frame, config.mode)?;
    Ok(flatten(result))
}

fn flatten(result: ModeResult) -> ImageOutcome {
    let has_detection = result.has_detection();
    let count = result.count();
    match result {
        ModeResult::Keypoint(r) => ImageOutcome {
            frame: r.frame,
            mask: r.mask,
            has_detection,
            count,
        },
        ModeResult::Color(r) => ImageOutcome {
            frame: r.frame,
            mask: r.mask,
            has_detection,
            count,
        },
    }
}
