//! RGB to HSV conversion and threshold masks.
//!
//! Channel ranges follow the OpenCV 8-bit convention so that published HSV
//! tables can be used unchanged: H in `0..=179`, S and V in `0..=255`.

use serde::{Deserialize, Serialize};

use crate::image::{Frame, GrayImage};

/// A named-channel HSV band: `lower[i] <= px[i] <= upper[i]` for all i.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Component bounds check: H within 0..=179 and lower <= upper per
    /// channel. Hue wrap-around bands are not supported.
    pub fn is_valid(&self) -> bool {
        if self.lower[0] > 179 || self.upper[0] > 179 {
            return false;
        }
        (0..3).all(|i| self.lower[i] <= self.upper[i])
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Owned HSV image, same interleaved layout as `Frame`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HsvImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl HsvImage {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Convert one RGB pixel. H is halved into `0..=179`.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { delta * 255.0 / v } else { 0.0 };

    let h_deg = if delta <= f32::EPSILON {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    [
        (h_deg / 2.0).round().min(179.0) as u8,
        s.round().min(255.0) as u8,
        v.round() as u8,
    ]
}

pub fn to_hsv(frame: &Frame) -> HsvImage {
    let mut data = vec![0u8; frame.data.len()];
    for (dst, src) in data.chunks_exact_mut(3).zip(frame.data.chunks_exact(3)) {
        let hsv = rgb_to_hsv([src[0], src[1], src[2]]);
        dst.copy_from_slice(&hsv);
    }
    HsvImage {
        width: frame.width,
        height: frame.height,
        data,
    }
}

/// Binary mask of pixels inside the band.
pub fn in_range(hsv: &HsvImage, range: &HsvRange) -> GrayImage {
    let mut out = GrayImage::new(hsv.width, hsv.height);
    for (dst, px) in out.data.iter_mut().zip(hsv.data.chunks_exact(3)) {
        if range.contains([px[0], px[1], px[2]]) {
            *dst = 255;
        }
    }
    out
}

/// Binary mask of pixels whose saturation lies in `lo..=hi`.
pub fn saturation_mask(hsv: &HsvImage, lo: u8, hi: u8) -> GrayImage {
    let mut out = GrayImage::new(hsv.width, hsv.height);
    for (dst, px) in out.data.iter_mut().zip(hsv.data.chunks_exact(3)) {
        let s = px[1];
        if s >= lo && s <= hi {
            *dst = 255;
        }
    }
    out
}

/// Box blur with an odd kernel, applied per channel. Even sizes are rounded
/// up; `k <= 1` is a no-op copy.
pub fn box_blur_hsv(hsv: &HsvImage, k: usize) -> HsvImage {
    if k <= 1 {
        return hsv.clone();
    }
    let k = k | 1;
    let r = (k / 2) as i32;
    let (w, h) = (hsv.width as i32, hsv.height as i32);
    let mut data = vec![0u8; hsv.data.len()];

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u32; 3];
            let mut n = 0u32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx < 0 || sy < 0 || sx >= w || sy >= h {
                        continue;
                    }
                    let i = (sy as usize * hsv.width + sx as usize) * 3;
                    acc[0] += hsv.data[i] as u32;
                    acc[1] += hsv.data[i + 1] as u32;
                    acc[2] += hsv.data[i + 2] as u32;
                    n += 1;
                }
            }
            let o = (y as usize * hsv.width + x as usize) * 3;
            for c in 0..3 {
                data[o + c] = (acc[c] / n) as u8;
            }
        }
    }

    HsvImage {
        width: hsv.width,
        height: hsv.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colors_map_to_opencv_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        // Gray has no saturation and hue 0.
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn in_range_selects_green_square() {
        let mut f = Frame::filled(8, 8, [30, 30, 30]);
        for y in 2..6 {
            for x in 2..6 {
                f.set_rgb(x, y, [0, 230, 0]);
            }
        }
        let hsv = to_hsv(&f);
        let band = HsvRange::new([30, 60, 60], [85, 255, 255]);
        let mask = in_range(&hsv, &band);
        assert_eq!(mask.count_nonzero(), 16);
        assert_eq!(mask.at(2, 2), 255);
        assert_eq!(mask.at(0, 0), 0);
    }

    #[test]
    fn range_validation() {
        assert!(HsvRange::new([30, 60, 60], [85, 255, 255]).is_valid());
        assert!(!HsvRange::new([180, 0, 0], [200, 255, 255]).is_valid());
        assert!(!HsvRange::new([10, 100, 0], [20, 50, 255]).is_valid());
    }

    #[test]
    fn blur_is_identity_for_unit_kernel() {
        let f = Frame::filled(4, 4, [10, 200, 30]);
        let hsv = to_hsv(&f);
        assert_eq!(box_blur_hsv(&hsv, 1), hsv);
    }

    #[test]
    fn serde_roundtrip() {
        let band = HsvRange::new([5, 120, 120], [20, 255, 255]);
        let json = serde_json::to_string(&band).unwrap();
        let back: HsvRange = serde_json::from_str(&json).unwrap();
        assert_eq!(band, back);
    }
}
