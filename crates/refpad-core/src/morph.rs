//! Binary-mask morphology with small structuring elements.

use crate::image::GrayImage;

/// Structuring element as a list of active offsets around the anchor.
#[derive(Clone, Debug)]
pub struct StructKernel {
    offsets: Vec<(i32, i32)>,
}

impl StructKernel {
    /// Filled ellipse (disc for square sizes). Even sizes are rounded up.
    pub fn ellipse(size: usize) -> Self {
        let size = size.max(1) | 1;
        let r = (size / 2) as i32;
        let rf = r as f32 + 0.5;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let (fx, fy) = (dx as f32, dy as f32);
                if (fx * fx + fy * fy) <= rf * rf {
                    offsets.push((dx, dy));
                }
            }
        }
        Self { offsets }
    }

    /// Full square block.
    pub fn rect(size: usize) -> Self {
        let size = size.max(1) | 1;
        let r = (size / 2) as i32;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                offsets.push((dx, dy));
            }
        }
        Self { offsets }
    }
}

pub fn dilate(mask: &GrayImage, kernel: &StructKernel) -> GrayImage {
    let (w, h) = (mask.width as i32, mask.height as i32);
    let mut out = GrayImage::new(mask.width, mask.height);
    for y in 0..h {
        for x in 0..w {
            if mask.data[(y * w + x) as usize] == 0 {
                continue;
            }
            for &(dx, dy) in &kernel.offsets {
                let (tx, ty) = (x + dx, y + dy);
                if tx >= 0 && ty >= 0 && tx < w && ty < h {
                    out.data[(ty * w + tx) as usize] = 255;
                }
            }
        }
    }
    out
}

pub fn erode(mask: &GrayImage, kernel: &StructKernel) -> GrayImage {
    let (w, h) = (mask.width as i32, mask.height as i32);
    let mut out = GrayImage::new(mask.width, mask.height);
    for y in 0..h {
        for x in 0..w {
            let mut keep = true;
            for &(dx, dy) in &kernel.offsets {
                let (tx, ty) = (x + dx, y + dy);
                // Out-of-bounds counts as background.
                if tx < 0 || ty < 0 || tx >= w || ty >= h {
                    keep = false;
                    break;
                }
                if mask.data[(ty * w + tx) as usize] == 0 {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.data[(y * w + x) as usize] = 255;
            }
        }
    }
    out
}

/// Closing: dilate then erode, `iterations` times each phase.
pub fn close(mask: &GrayImage, kernel: &StructKernel, iterations: usize) -> GrayImage {
    let mut m = mask.clone();
    for _ in 0..iterations {
        m = dilate(&m, kernel);
    }
    for _ in 0..iterations {
        m = erode(&m, kernel);
    }
    m
}

/// Opening: erode then dilate, `iterations` times each phase.
pub fn open(mask: &GrayImage, kernel: &StructKernel, iterations: usize) -> GrayImage {
    let mut m = mask.clone();
    for _ in 0..iterations {
        m = erode(&m, kernel);
    }
    for _ in 0..iterations {
        m = dilate(&m, kernel);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(w: usize, h: usize, px: &[(usize, usize)]) -> GrayImage {
        let mut m = GrayImage::new(w, h);
        for &(x, y) in px {
            m.set(x, y, 255);
        }
        m
    }

    #[test]
    fn close_bridges_a_one_pixel_gap() {
        // Two 3x3 blocks separated by a single empty column.
        let mut px = Vec::new();
        for y in 3..6 {
            for x in 2..5 {
                px.push((x, y));
            }
            for x in 6..9 {
                px.push((x, y));
            }
        }
        let m = blob(12, 10, &px);
        let closed = close(&m, &StructKernel::ellipse(3), 1);
        assert_eq!(closed.at(5, 4), 255, "gap should be filled");
    }

    #[test]
    fn open_removes_speckle() {
        let mut px = vec![(6, 6)];
        for y in 1..4 {
            for x in 1..4 {
                px.push((x, y));
            }
        }
        let m = blob(8, 8, &px);
        let opened = open(&m, &StructKernel::rect(3), 1);
        assert_eq!(opened.at(6, 6), 0, "lone pixel should vanish");
        assert_eq!(opened.at(2, 2), 255, "block core should survive");
    }

    #[test]
    fn erode_shrinks_dilate_grows() {
        let mut px = Vec::new();
        for y in 2..7 {
            for x in 2..7 {
                px.push((x, y));
            }
        }
        let m = blob(10, 10, &px);
        let k = StructKernel::rect(3);
        assert!(erode(&m, &k).count_nonzero() < m.count_nonzero());
        assert!(dilate(&m, &k).count_nonzero() > m.count_nonzero());
    }
}
