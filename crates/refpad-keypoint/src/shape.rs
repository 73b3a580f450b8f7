//! Hu-moment shape signature for the coarse pre-filter.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use refpad_core::{
    bounding_rect, contour_area, fill_polygon, find_external_contours, hu_invariants,
    hu_log_distance, moments_of_mask, GrayImage,
};
use refpad_features::edge_map;

/// Seven Hu invariants of the largest edge contour, compared in
/// log-magnitude space.
///
/// This is a coarse gate only: it skips descriptor matching for regions that
/// cannot plausibly be the pad, and never accepts a detection by itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSignature(pub [f64; 7]);

impl ShapeSignature {
    /// Signature of the dominant shape in a grayscale image: edge map,
    /// largest external contour, filled and measured. `None` when the image
    /// has no edge contours at all.
    pub fn from_gray(gray: &GrayImage) -> Option<Self> {
        let edges = edge_map(gray, 60);
        let contours = find_external_contours(&edges);
        let largest = contours
            .into_iter()
            .max_by(|a, b| {
                contour_area(a)
                    .partial_cmp(&contour_area(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        if largest.points.len() < 3 {
            return None;
        }

        // Rasterize the filled contour locally so the measurement does not
        // depend on where the shape sits in the image.
        let rect = bounding_rect(&largest);
        let poly: Vec<Point2<f32>> = largest
            .points
            .iter()
            .map(|&(x, y)| Point2::new((x - rect.x) as f32, (y - rect.y) as f32))
            .collect();
        let mut mask = GrayImage::new(rect.w as usize + 1, rect.h as usize + 1);
        fill_polygon(&mut mask, &poly, 255);

        let m = moments_of_mask(&mask);
        if m.m00 <= 0.0 {
            return None;
        }
        Some(Self(hu_invariants(&m)))
    }

    #[inline]
    pub fn distance(&self, other: &ShapeSignature) -> f64 {
        hu_log_distance(&self.0, &other.0)
    }
}
