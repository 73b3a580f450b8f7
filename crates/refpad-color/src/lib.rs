//! Color-segmentation pad detection.
//!
//! Independent of the keypoint pipeline: thresholds the frame against a table
//! of named HSV bands, cleans each mask morphologically, filters contours by
//! area, aspect ratio and solidity, and reports simplified contours plus a
//! global occupancy mask.

mod detect;
mod params;

pub use detect::{ColorDetection, ColorDetector};
pub use params::{default_color_table, ColorDetectorParams, NamedRange};
