//! Preprocessing before keypoint extraction.
//!
//! Low-texture pads yield few corners on raw luminance. Equalizing the
//! luminance histogram and blending in a dilated edge map raises the corner
//! yield without moving corner positions.

use refpad_core::{dilate, Frame, GrayImage, StructKernel};

/// Global luminance histogram equalization. The mapping is monotonic, so
/// intensity-order comparisons (and therefore BRIEF bits) are preserved.
pub fn equalize_luminance(gray: &GrayImage) -> GrayImage {
    let total = gray.data.len();
    if total == 0 {
        return gray.clone();
    }

    let mut hist = [0u32; 256];
    for &v in &gray.data {
        hist[v as usize] += 1;
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    let cdf_min = hist.iter().find(|&&h| h > 0).copied().unwrap_or(0) as u64;
    let denom = (total as u64).saturating_sub(cdf_min).max(1);
    for (v, &h) in hist.iter().enumerate() {
        cdf += h as u64;
        let num = cdf.saturating_sub(cdf_min) * 255;
        lut[v] = (num / denom).min(255) as u8;
    }

    let data = gray.data.iter().map(|&v| lut[v as usize]).collect();
    GrayImage {
        width: gray.width,
        height: gray.height,
        data,
    }
}

/// Sobel gradient-magnitude edges, binarized at `threshold`.
pub fn edge_map(gray: &GrayImage, threshold: u16) -> GrayImage {
    let (w, h) = (gray.width, gray.height);
    let mut out = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: i64, dy: i64| -> i64 {
                gray.data[((y as i64 + dy) as usize) * w + (x as i64 + dx) as usize] as i64
            };
            let gx = -p(-1, -1) - 2 * p(-1, 0) - p(-1, 1) + p(1, -1) + 2 * p(1, 0) + p(1, 1);
            let gy = -p(-1, -1) - 2 * p(0, -1) - p(1, -1) + p(-1, 1) + 2 * p(0, 1) + p(1, 1);
            let mag = ((gx * gx + gy * gy) as f64).sqrt();
            if mag >= threshold as f64 {
                out.data[y * w + x] = 255;
            }
        }
    }
    out
}

/// The extraction input: equalized luminance blended with a dilated edge
/// map, `0.7 * edges + 0.3 * gray`.
pub fn preprocess_for_keypoints(frame: &Frame) -> GrayImage {
    let gray = frame.to_gray();
    let eq = equalize_luminance(&gray);
    let edges = dilate(&edge_map(&eq, 60), &StructKernel::ellipse(3));

    let mut out = GrayImage::new(gray.width, gray.height);
    for i in 0..out.data.len() {
        let v = 0.7 * edges.data[i] as f32 + 0.3 * eq.data[i] as f32;
        out.data[i] = v.round().min(255.0) as u8;
    }
    out
}
