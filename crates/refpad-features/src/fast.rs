//! FAST-9 segment-test corner detection with 3x3 non-maximum suppression.

use refpad_core::GrayImage;

use crate::extractor::Keypoint;

// Bresenham circle of radius 3, clockwise from 12 o'clock.
const RING: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const ARC_LEN: usize = 9;

/// Segment-test score: sum of |ring - center| over pixels past the threshold,
/// or 0 when no contiguous bright/dark arc of length 9 exists.
fn corner_score(img: &GrayImage, x: i32, y: i32, threshold: i16) -> f32 {
    let w = img.width as i32;
    let p = img.data[(y * w + x) as usize] as i16;

    let mut diffs = [0i16; 16];
    for (i, &(dx, dy)) in RING.iter().enumerate() {
        let v = img.data[((y + dy) * w + (x + dx)) as usize] as i16;
        diffs[i] = v - p;
    }

    let mut best = 0i32;
    for dark in [false, true] {
        let mut run = 0usize;
        let mut run_sum = 0i32;
        let mut found = 0i32;
        // Walk the ring twice to catch wrap-around arcs.
        for i in 0..32 {
            let d = diffs[i % 16];
            let hit = if dark { d < -threshold } else { d > threshold };
            if hit {
                run += 1;
                run_sum += d.unsigned_abs() as i32;
                if run >= ARC_LEN {
                    found = found.max(run_sum);
                }
                if run >= 16 {
                    break; // full circle; no point walking further
                }
            } else {
                run = 0;
                run_sum = 0;
            }
        }
        best = best.max(found);
    }
    best as f32
}

/// Detect FAST corners with a border margin (the caller's descriptor patch
/// must stay inside the image) and keep the strongest `max_count` after NMS.
pub fn detect_fast(
    img: &GrayImage,
    threshold: u8,
    margin: usize,
    max_count: usize,
) -> Vec<Keypoint> {
    let (w, h) = (img.width, img.height);
    let margin = margin.max(3);
    if w <= 2 * margin || h <= 2 * margin {
        return Vec::new();
    }

    let mut scores = vec![0.0f32; w * h];
    let t = threshold as i16;
    for y in margin..h - margin {
        for x in margin..w - margin {
            scores[y * w + x] = corner_score(img, x as i32, y as i32, t);
        }
    }

    let mut kps = Vec::new();
    for y in margin..h - margin {
        for x in margin..w - margin {
            let s = scores[y * w + x];
            if s <= 0.0 {
                continue;
            }
            let mut is_max = true;
            'nms: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = scores[(y as i32 + dy) as usize * w + (x as i32 + dx) as usize];
                    if n > s || (n == s && (dy < 0 || (dy == 0 && dx < 0))) {
                        is_max = false;
                        break 'nms;
                    }
                }
            }
            if is_max {
                kps.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    score: s,
                    angle: 0.0,
                });
            }
        }
    }

    kps.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    kps.truncate(max_count);
    kps
}
