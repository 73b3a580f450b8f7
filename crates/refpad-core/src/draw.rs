//! Overlay drawing for annotated result frames.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::{Frame, GrayImage};
use crate::poly::fill_polygon;

/// How accepted detections are painted onto the output frame.
/// Drawing never affects detection decisions.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DrawStyle {
    pub border_color: [u8; 3],
    pub fill_color: [u8; 3],
    /// Fill opacity in `0..=1`.
    pub fill_alpha: f32,
    /// Border thickness in pixels; 0 picks a thickness from the frame size.
    pub border_thickness: u32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            border_color: [0, 255, 0],
            fill_color: [0, 255, 0],
            fill_alpha: 0.25,
            border_thickness: 3,
        }
    }
}

/// `max(2, 0.003 * max(w, h))` — scales the outline with the frame.
pub fn auto_border_thickness(width: usize, height: usize) -> u32 {
    (0.003 * width.max(height) as f32).floor().max(2.0) as u32
}

/// Alpha-blend the polygon interior, then stroke its border.
pub fn draw_polygon(frame: &mut Frame, poly: &[Point2<f32>], style: &DrawStyle) {
    if poly.len() < 3 {
        return;
    }

    let alpha = style.fill_alpha.clamp(0.0, 1.0);
    if alpha > 0.0 {
        let mut cover = GrayImage::new(frame.width, frame.height);
        fill_polygon(&mut cover, poly, 255);
        for y in 0..frame.height {
            for x in 0..frame.width {
                if cover.at(x, y) == 0 {
                    continue;
                }
                let px = frame.rgb_at(x, y);
                let mut out = [0u8; 3];
                for c in 0..3 {
                    out[c] = (alpha * style.fill_color[c] as f32
                        + (1.0 - alpha) * px[c] as f32)
                        .round() as u8;
                }
                frame.set_rgb(x, y, out);
            }
        }
    }

    let thickness = if style.border_thickness == 0 {
        auto_border_thickness(frame.width, frame.height)
    } else {
        style.border_thickness
    };
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        stroke_segment(frame, a, b, style.border_color, thickness);
    }
}

fn stroke_segment(frame: &mut Frame, a: Point2<f32>, b: Point2<f32>, color: [u8; 3], t: u32) {
    let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    let steps = len.ceil().max(1.0) as usize;
    let r = (t as i32 - 1) / 2;
    for s in 0..=steps {
        let f = s as f32 / steps as f32;
        let cx = (a.x + f * (b.x - a.x)).round() as i32;
        let cy = (a.y + f * (b.y - a.y)).round() as i32;
        for dy in -r..=r + (t as i32 - 1) % 2 {
            for dx in -r..=r + (t as i32 - 1) % 2 {
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as usize) < frame.width && (y as usize) < frame.height {
                    frame.set_rgb(x as usize, y as usize, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, s: f32) -> Vec<Point2<f32>> {
        vec![
            Point2::new(x, y),
            Point2::new(x + s, y),
            Point2::new(x + s, y + s),
            Point2::new(x, y + s),
        ]
    }

    #[test]
    fn fill_blends_with_background() {
        let mut f = Frame::filled(40, 40, [100, 100, 100]);
        let style = DrawStyle {
            border_color: [255, 0, 0],
            fill_color: [0, 0, 255],
            fill_alpha: 0.5,
            border_thickness: 1,
        };
        draw_polygon(&mut f, &square(5.0, 5.0, 20.0), &style);
        let inner = f.rgb_at(15, 15);
        assert_eq!(inner, [50, 50, 178]);
        // Border pixel painted solid.
        assert_eq!(f.rgb_at(5, 15), [255, 0, 0]);
        // Outside untouched.
        assert_eq!(f.rgb_at(35, 35), [100, 100, 100]);
    }

    #[test]
    fn zero_thickness_scales_with_frame() {
        assert_eq!(auto_border_thickness(640, 480), 2);
        assert_eq!(auto_border_thickness(1920, 1080), 5);
    }

    #[test]
    fn degenerate_polygon_is_ignored() {
        let mut f = Frame::filled(10, 10, [1, 2, 3]);
        let before = f.clone();
        draw_polygon(
            &mut f,
            &[Point2::new(1.0, 1.0), Point2::new(5.0, 5.0)],
            &DrawStyle::default(),
        );
        assert_eq!(f, before);
    }
}
