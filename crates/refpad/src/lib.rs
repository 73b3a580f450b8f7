//! High-level facade for the `refpad-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the detector crates
//! - the mode orchestrator combining the keypoint and color pipelines
//! - frame source / result sink contracts and the blocking session loop
//! - a validated application configuration
//! - (feature `image`) end-to-end helpers from files and `image` buffers
//!
//! ## Quickstart
//!
//! ```no_run
//! use refpad::config::AppConfig;
//! use refpad::detect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let outcome = detect::detect_image("scene.png", &["pad.png".into()], &config)?;
//! println!("hit: {} ({} matches)", outcome.has_detection, outcome.count);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`core`](refpad_core): frames, contours, homographies, drawing.
//! - [`features`](refpad_features): FAST/BRIEF backend and matching.
//! - [`keypoint`](refpad_keypoint): reference bank and the keypoint pipeline.
//! - [`color`](refpad_color): HSV segmentation pipeline.
//! - [`orchestrator`]: mode selection and the auto-fallback policy.
//! - [`session`]: read-detect-emit loop with cooperative cancellation.

pub use refpad_color as color;
pub use refpad_core as core;
pub use refpad_features as features;
pub use refpad_keypoint as keypoint;

pub use refpad_color::{ColorDetection, ColorDetector, ColorDetectorParams};
pub use refpad_core::{DrawStyle, Frame, GrayImage, HsvRange};
pub use refpad_keypoint::{
    PadDetection, PadDetector, PadDetectorParams, Reference, ReferenceBank, ReferenceLoadError,
};

pub mod config;
pub mod orchestrator;
pub mod session;
pub mod sink;
pub mod source;

#[cfg(feature = "image")]
pub mod detect;

pub use orchestrator::{DetectorMode, ModeResult, Orchestrator, OrchestratorError};
pub use sink::{FrameMeta, ResultSink, SinkSet};
pub use source::{FrameSeq, FrameSource, SourceOpenError};
