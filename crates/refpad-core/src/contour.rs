//! External contour extraction and contour geometry.
//!
//! `find_external_contours` walks each 8-connected foreground component of a
//! binary mask and returns its ordered outer boundary (Moore neighbor
//! tracing). Holes are not reported.

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Perimeter of the rectangle outline.
    #[inline]
    pub fn perimeter(&self) -> f32 {
        2.0 * (self.w + self.h) as f32
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.w as f32 / (self.h.max(1)) as f32
    }
}

/// Ordered outer boundary of one connected component.
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

// Clockwise neighborhood in image coordinates (y grows down).
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn dir_index(from: (i32, i32), to: (i32, i32)) -> usize {
    let d = (to.0 - from.0, to.1 - from.1);
    DIRS.iter().position(|&v| v == d).unwrap_or(4)
}

/// Trace all outer boundaries of the mask's foreground components.
pub fn find_external_contours(mask: &crate::GrayImage) -> Vec<Contour> {
    let (w, h) = (mask.width as i32, mask.height as i32);
    let fg = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && x < w && y < h && mask.data[(y * w + x) as usize] != 0
    };

    let mut labeled = vec![false; mask.data.len()];
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if !fg(x, y) || labeled[idx] {
                continue;
            }

            // Flood the whole component first so later raster hits skip it.
            let mut stack = vec![(x, y)];
            labeled[idx] = true;
            while let Some((cx, cy)) = stack.pop() {
                for &(dx, dy) in &DIRS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if fg(nx, ny) {
                        let ni = (ny * w + nx) as usize;
                        if !labeled[ni] {
                            labeled[ni] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            contours.push(trace_boundary(&fg, (x, y)));
        }
    }

    contours
}

fn trace_boundary(fg: &dyn Fn(i32, i32) -> bool, start: (i32, i32)) -> Contour {
    // The raster-first pixel always has a background west neighbor.
    let init_prev = (start.0 - 1, start.1);
    let mut points = vec![start];
    let mut cur = start;
    let mut prev = init_prev;

    loop {
        let from = dir_index(cur, prev);
        let mut next = None;
        for step in 1..=8 {
            let di = (from + step) % 8;
            let cand = (cur.0 + DIRS[di].0, cur.1 + DIRS[di].1);
            if fg(cand.0, cand.1) {
                // Backtrack point is the last background cell scanned.
                let pi = (from + step + 7) % 8;
                next = Some((cand, (cur.0 + DIRS[pi].0, cur.1 + DIRS[pi].1)));
                break;
            }
        }

        let Some((n, p)) = next else {
            break; // isolated pixel
        };
        cur = n;
        prev = p;
        if cur == start && prev == init_prev {
            break;
        }
        points.push(cur);
        if points.len() > 4 * 8 * 1024 * 1024 {
            break; // malformed input guard
        }
    }

    Contour { points }
}

/// Shoelace area of the boundary polygon.
pub fn contour_area(c: &Contour) -> f64 {
    let pts = &c.points;
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..pts.len() {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % pts.len()];
        acc += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    (acc.abs() as f64) / 2.0
}

/// Closed arc length of the boundary polygon.
pub fn contour_perimeter(c: &Contour) -> f64 {
    let pts = &c.points;
    if pts.len() < 2 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..pts.len() {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % pts.len()];
        let (dx, dy) = ((x1 - x0) as f64, (y1 - y0) as f64);
        acc += (dx * dx + dy * dy).sqrt();
    }
    acc
}

pub fn bounding_rect(c: &Contour) -> Rect {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for &(x, y) in &c.points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    Rect {
        x: min_x,
        y: min_y,
        w: max_x - min_x + 1,
        h: max_y - min_y + 1,
    }
}

/// Convex hull via Andrew's monotone chain, counter-clockwise.
pub fn convex_hull(c: &Contour) -> Vec<(i32, i32)> {
    let mut pts: Vec<(i32, i32)> = c.points.clone();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: (i32, i32), a: (i32, i32), b: (i32, i32)| -> i64 {
        (a.0 - o.0) as i64 * (b.1 - o.1) as i64 - (a.1 - o.1) as i64 * (b.0 - o.0) as i64
    };

    let mut hull: Vec<(i32, i32)> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Shoelace area of a hull (or any simple polygon given as a point list).
pub fn hull_area(hull: &[(i32, i32)]) -> f64 {
    if hull.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..hull.len() {
        let (x0, y0) = hull[i];
        let (x1, y1) = hull[(i + 1) % hull.len()];
        acc += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    (acc.abs() as f64) / 2.0
}

/// Douglas-Peucker simplification of a closed contour.
pub fn approx_polygon(c: &Contour, epsilon: f64) -> Vec<(i32, i32)> {
    let pts = &c.points;
    if pts.len() < 3 || epsilon <= 0.0 {
        return pts.clone();
    }

    // Split the ring at the point farthest from the start.
    let mut far = 1;
    let mut far_d = 0.0;
    for (i, &p) in pts.iter().enumerate().skip(1) {
        let (dx, dy) = ((p.0 - pts[0].0) as f64, (p.1 - pts[0].1) as f64);
        let d = dx * dx + dy * dy;
        if d > far_d {
            far_d = d;
            far = i;
        }
    }

    let mut first = dp_simplify(&pts[0..=far], epsilon);
    let mut second: Vec<(i32, i32)> = pts[far..].to_vec();
    second.push(pts[0]);
    let second = dp_simplify(&second, epsilon);

    first.pop();
    first.extend_from_slice(&second[..second.len() - 1]);
    first
}

fn dp_simplify(pts: &[(i32, i32)], epsilon: f64) -> Vec<(i32, i32)> {
    if pts.len() < 3 {
        return pts.to_vec();
    }
    let (a, b) = (pts[0], pts[pts.len() - 1]);
    let mut far = 0usize;
    let mut far_d = 0.0;
    for (i, &p) in pts.iter().enumerate().take(pts.len() - 1).skip(1) {
        let d = segment_distance(p, a, b);
        if d > far_d {
            far_d = d;
            far = i;
        }
    }
    if far_d <= epsilon {
        return vec![a, b];
    }
    let mut left = dp_simplify(&pts[0..=far], epsilon);
    let right = dp_simplify(&pts[far..], epsilon);
    left.pop();
    left.extend_from_slice(&right);
    left
}

fn segment_distance(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (vx, vy) = (bx - ax, by - ay);
    let len2 = vx * vx + vy * vy;
    if len2 <= f64::EPSILON {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = ((px - ax) * vx + (py - ay) * vy) / len2;
    let t = t.clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * vx, ay + t * vy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
