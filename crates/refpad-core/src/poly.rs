//! Polygon rasterization and raster overlap scoring.

use nalgebra::Point2;

use crate::contour::Rect;
use crate::image::GrayImage;

/// Even-odd scanline fill of a closed polygon into a mask, clamped to the
/// mask bounds. Sampling is at pixel centers.
pub fn fill_polygon(mask: &mut GrayImage, poly: &[Point2<f32>], value: u8) {
    if poly.len() < 3 {
        return;
    }

    let min_y = poly.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = poly.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let y0 = (min_y.floor().max(0.0)) as usize;
    let y1 = (max_y.ceil().min(mask.height as f32)) as usize;

    let mut xs: Vec<f32> = Vec::with_capacity(8);
    for row in y0..y1 {
        let yc = row as f32 + 0.5;
        xs.clear();
        for i in 0..poly.len() {
            let a = poly[i];
            let b = poly[(i + 1) % poly.len()];
            if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                let t = (yc - a.y) / (b.y - a.y);
                xs.push(a.x + t * (b.x - a.x));
            }
        }
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
        for pair in xs.chunks_exact(2) {
            let x0 = (pair[0].ceil().max(0.0)) as usize;
            let x1 = (pair[1].floor().min(mask.width as f32 - 1.0)) as i64;
            for x in x0 as i64..=x1 {
                if x >= 0 {
                    mask.set(x as usize, row, value);
                }
            }
        }
    }
}

/// Intersection-over-union between a polygon and an axis-aligned rectangle,
/// computed on a shared raster covering both.
pub fn poly_rect_iou(poly: &[Point2<f32>], rect: Rect) -> f32 {
    if poly.len() < 3 || rect.w <= 0 || rect.h <= 0 {
        return 0.0;
    }

    let min_x = poly
        .iter()
        .map(|p| p.x)
        .fold(rect.x as f32, f32::min)
        .floor()
        .max(0.0) as i64;
    let min_y = poly
        .iter()
        .map(|p| p.y)
        .fold(rect.y as f32, f32::min)
        .floor()
        .max(0.0) as i64;
    let max_x = poly
        .iter()
        .map(|p| p.x)
        .fold((rect.x + rect.w) as f32, f32::max)
        .ceil() as i64;
    let max_y = poly
        .iter()
        .map(|p| p.y)
        .fold((rect.y + rect.h) as f32, f32::max)
        .ceil() as i64;

    let w = (max_x - min_x).max(1) as usize;
    let h = (max_y - min_y).max(1) as usize;

    let shifted: Vec<Point2<f32>> = poly
        .iter()
        .map(|p| Point2::new(p.x - min_x as f32, p.y - min_y as f32))
        .collect();
    let mut raster = GrayImage::new(w, h);
    fill_polygon(&mut raster, &shifted, 255);

    let rx0 = rect.x as i64 - min_x;
    let ry0 = rect.y as i64 - min_y;
    let rx1 = rx0 + rect.w as i64;
    let ry1 = ry0 + rect.h as i64;

    let mut inter = 0u64;
    let mut union = 0u64;
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let in_poly = raster.at(x as usize, y as usize) != 0;
            let in_rect = x >= rx0 && x < rx1 && y >= ry0 && y < ry1;
            if in_poly && in_rect {
                inter += 1;
            }
            if in_poly || in_rect {
                union += 1;
            }
        }
    }

    if union == 0 {
        return 0.0;
    }
    inter as f32 / union as f32
}
