//! Matcher and pose-validation pipeline.
//!
//! Wires region proposals, the shape pre-filter, descriptor matching and
//! robust pose fitting into a per-frame detection call.

mod params;
mod pipeline;
mod result;

pub use params::{MatchParams, PadDetectorParams};
pub use pipeline::PadDetector;
pub use result::PadDetection;
