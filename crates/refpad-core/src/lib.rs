//! Core building blocks for reference-pad detection.
//!
//! This crate is intentionally free of image I/O. Detectors operate on plain
//! row-major pixel buffers (`Frame` for RGB, `GrayImage` for masks and
//! luminance) so that callers decide how frames are produced.

mod contour;
mod draw;
mod homography;
mod hsv;
mod image;
mod logger;
mod moments;
mod morph;
mod poly;

pub use contour::{
    approx_polygon, bounding_rect, contour_area, contour_perimeter, convex_hull,
    find_external_contours, hull_area, Contour, Rect,
};
pub use draw::{auto_border_thickness, draw_polygon, DrawStyle};
pub use homography::{
    estimate_homography, project_reference_corners, ransac_homography, Homography, RansacParams,
};
pub use hsv::{box_blur_hsv, in_range, rgb_to_hsv, saturation_mask, to_hsv, HsvImage, HsvRange};
pub use image::{Frame, GrayImage, GrayView};
pub use moments::{hu_invariants, hu_log_distance, moments_of_mask, Moments};
pub use morph::{close, dilate, erode, open, StructKernel};
pub use poly::{fill_polygon, poly_rect_iou};

pub use logger::init_with_level;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;
