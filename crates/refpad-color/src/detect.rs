use std::cell::Cell;

use log::debug;
use nalgebra::Point2 as NaPoint2;

use refpad_core::{
    approx_polygon, bounding_rect, box_blur_hsv, close, contour_area, contour_perimeter,
    convex_hull, draw_polygon, fill_polygon, find_external_contours, hull_area, in_range, open,
    to_hsv, Contour, Frame, GrayImage, StructKernel,
};

use crate::params::ColorDetectorParams;

// The drawing helpers speak nalgebra points.
type Point2 = NaPoint2<f32>;

/// Per-frame outcome of the color pipeline.
#[derive(Clone, Debug)]
pub struct ColorDetection {
    /// Input frame with accepted contours painted on it.
    pub frame: Frame,
    /// Union occupancy mask over all accepted contours; `None` when empty.
    pub mask: Option<GrayImage>,
    /// Accepted (color label, simplified contour) pairs.
    pub detections: Vec<(String, Vec<(i32, i32)>)>,
    pub total_detections: usize,
    /// Labels that produced at least one accepted contour.
    pub colors_found: Vec<String>,
}

impl ColorDetection {
    #[inline]
    pub fn has_detection(&self) -> bool {
        self.total_detections > 0
    }
}

/// HSV segmentation detector. Stateless per frame apart from the invocation
/// counter, which exists so orchestration order is observable.
pub struct ColorDetector {
    params: ColorDetectorParams,
    runs: Cell<u64>,
}

impl ColorDetector {
    pub fn new(params: ColorDetectorParams) -> Self {
        Self {
            params,
            runs: Cell::new(0),
        }
    }

    #[inline]
    pub fn params(&self) -> &ColorDetectorParams {
        &self.params
    }

    /// How many frames this detector has processed.
    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// Scan every configured band and accumulate accepted contours.
    /// Deterministic: identical frames yield identical results.
    pub fn detect_in_frame(&self, frame: &Frame) -> ColorDetection {
        self.runs.set(self.runs.get() + 1);
        let p = &self.params;

        let mut output = frame.clone();
        let mut global_mask = GrayImage::new(frame.width, frame.height);
        let mut detections: Vec<(String, Vec<(i32, i32)>)> = Vec::new();
        let mut colors_found: Vec<String> = Vec::new();

        let hsv = box_blur_hsv(&to_hsv(frame), p.blur_kernel);
        let kernel = StructKernel::rect(p.morph_kernel);

        for color in &p.colors {
            let mask = in_range(&hsv, &color.range);
            // Fill holes, then knock out speckle.
            let mask = open(&close(&mask, &kernel, 2), &kernel, 1);

            let mut accepted = 0usize;
            for contour in find_external_contours(&mask) {
                let Some(poly) = self.accept_contour(&contour) else {
                    continue;
                };
                let poly_f: Vec<Point2> = poly
                    .iter()
                    .map(|&(x, y)| Point2::new(x as f32, y as f32))
                    .collect();
                draw_polygon(&mut output, &poly_f, &p.style);
                fill_polygon(&mut global_mask, &poly_f, 255);
                detections.push((color.name.clone(), poly));
                accepted += 1;
            }
            if accepted > 0 {
                debug!("color '{}': {} contour(s) accepted", color.name, accepted);
                colors_found.push(color.name.clone());
            }
        }

        let total_detections = detections.len();
        let mask = (global_mask.count_nonzero() > 0).then_some(global_mask);
        ColorDetection {
            frame: output,
            mask,
            detections,
            total_detections,
            colors_found,
        }
    }

    /// Area, aspect and solidity gates; returns the simplified polygon of an
    /// accepted contour.
    fn accept_contour(&self, contour: &Contour) -> Option<Vec<(i32, i32)>> {
        let p = &self.params;
        let area = contour_area(contour);
        if area < p.min_area || area > p.max_area {
            return None;
        }
        let rect = bounding_rect(contour);
        let aspect = rect.aspect_ratio();
        if aspect < p.aspect_min || aspect > p.aspect_max {
            return None;
        }
        let hull = convex_hull(contour);
        let solidity = area / hull_area(&hull).max(1.0);
        if solidity < p.solidity_min {
            return None;
        }

        let epsilon = p.simplify_epsilon_frac * contour_perimeter(contour);
        let poly = approx_polygon(contour, epsilon);
        (poly.len() >= 3).then_some(poly)
    }
}
