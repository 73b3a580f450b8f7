//! Projective transforms: normalized DLT estimation and a RANSAC fit that
//! tolerates outlier correspondences.

use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Hartley normalization: translate to the centroid and scale so the mean
/// distance from it is sqrt(2).
fn normalization_transform(pts: &[Point2<f32>]) -> Matrix3<f64> {
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply_t(t: &Matrix3<f64>, p: Point2<f32>) -> Point2<f64> {
    let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    Point2::new(v[0], v[1])
}

/// Estimate H with `dst ~ H * src` from n >= 4 correspondences: an exact
/// 8x8 solve for the minimal case, normalized DLT (smallest-singular-vector
/// solution) for the overdetermined one.
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        // A 8x9 system has no thin-SVD null vector; solve with h33 = 1.
        return estimate_from_4(src, dst);
    }

    let t_src = normalization_transform(src);
    let t_dst = normalization_transform(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let s = apply_t(&t_src, src[k]);
        let d = apply_t(&t_dst, dst[k]);
        let (x, y) = (s.x, s.y);
        let (u, v) = (d.x, d.y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let hrow = vt.row(vt.nrows().checked_sub(1)?);
    let hn = Matrix3::from_row_slice(&[
        hrow[0], hrow[1], hrow[2], hrow[3], hrow[4], hrow[5], hrow[6], hrow[7], hrow[8],
    ]);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Minimal-case solve: for each pair (x,y) -> (u,v),
/// `h11 x + h12 y + h13 - u h31 x - u h32 y = u` (and likewise for v),
/// with `h33` fixed to 1. Normalization keeps the system well conditioned.
fn estimate_from_4(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    let t_src = normalization_transform(src);
    let t_dst = normalization_transform(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let s = apply_t(&t_src, src[k]);
        let d = apply_t(&t_dst, dst[k]);
        let (x, y) = (s.x, s.y);
        let (u, v) = (d.x, d.y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Robust fit settings. The defaults match a 5 px reprojection tolerance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RansacParams {
    pub reproj_tol: f32,
    pub max_iters: usize,
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reproj_tol: 5.0,
            max_iters: 256,
            seed: 0x9e37_79b9_7f4a_7c15,
        }
    }
}

#[inline]
fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

fn tri_area(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> f32 {
    ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() * 0.5
}

/// A minimal sample is degenerate when any three points are nearly collinear.
fn sample_degenerate(pts: &[Point2<f32>; 4]) -> bool {
    const MIN_AREA: f32 = 1.0;
    tri_area(pts[0], pts[1], pts[2]) < MIN_AREA
        || tri_area(pts[0], pts[1], pts[3]) < MIN_AREA
        || tri_area(pts[0], pts[2], pts[3]) < MIN_AREA
        || tri_area(pts[1], pts[2], pts[3]) < MIN_AREA
}

fn count_inliers(
    h: &Homography,
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    tol2: f32,
    flags: &mut [bool],
) -> usize {
    let mut n = 0;
    for i in 0..src.len() {
        let p = h.apply(src[i]);
        let dx = p.x - dst[i].x;
        let dy = p.y - dst[i].y;
        let ok = dx.is_finite() && dy.is_finite() && dx * dx + dy * dy <= tol2;
        flags[i] = ok;
        if ok {
            n += 1;
        }
    }
    n
}

/// RANSAC homography: repeated minimal fits, inlier consensus, final
/// least-squares refit on the consensus set.
///
/// Returns the refit transform and the inlier flags, or `None` when fewer
/// than 4 usable correspondences remain.
pub fn ransac_homography(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    params: &RansacParams,
) -> Option<(Homography, Vec<bool>)> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    let n = src.len();
    let tol2 = params.reproj_tol * params.reproj_tol;
    let mut rng = params.seed ^ (n as u64);

    let mut best: Option<(usize, Homography)> = None;
    let mut flags = vec![false; n];

    for _ in 0..params.max_iters {
        let mut idx = [0usize; 4];
        for slot in &mut idx {
            *slot = (lcg_next(&mut rng) % n as u64) as usize;
        }
        if idx[0] == idx[1]
            || idx[0] == idx[2]
            || idx[0] == idx[3]
            || idx[1] == idx[2]
            || idx[1] == idx[3]
            || idx[2] == idx[3]
        {
            continue;
        }

        let s4 = [src[idx[0]], src[idx[1]], src[idx[2]], src[idx[3]]];
        let d4 = [dst[idx[0]], dst[idx[1]], dst[idx[2]], dst[idx[3]]];
        if sample_degenerate(&s4) || sample_degenerate(&d4) {
            continue;
        }

        let Some(h) = estimate_homography(&s4, &d4) else {
            continue;
        };
        let score = count_inliers(&h, src, dst, tol2, &mut flags);
        if score >= 4 && best.as_ref().map_or(true, |(b, _)| score > *b) {
            best = Some((score, h));
            if score == n {
                break;
            }
        }
    }

    let (_, h0) = best?;

    // Refit on the consensus set for the final answer.
    count_inliers(&h0, src, dst, tol2, &mut flags);
    let in_src: Vec<Point2<f32>> = src
        .iter()
        .zip(&flags)
        .filter_map(|(p, &f)| f.then_some(*p))
        .collect();
    let in_dst: Vec<Point2<f32>> = dst
        .iter()
        .zip(&flags)
        .filter_map(|(p, &f)| f.then_some(*p))
        .collect();
    if in_src.len() < 4 {
        return None;
    }

    let refined = estimate_homography(&in_src, &in_dst).unwrap_or(h0);
    let final_count = count_inliers(&refined, src, dst, tol2, &mut flags);
    if final_count < 4 {
        return None;
    }
    Some((refined, flags))
}

/// The four reference corners `(0,0) (w,0) (w,h) (0,h)` mapped through H.
pub fn project_reference_corners(h: &Homography, width: usize, height: usize) -> [Point2<f32>; 4] {
    let (w, hh) = (width as f32, height as f32);
    [
        h.apply(Point2::new(0.0, 0.0)),
        h.apply(Point2::new(w, 0.0)),
        h.apply(Point2::new(w, hh)),
        h.apply(Point2::new(0.0, hh)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, step: f32) -> Vec<Point2<f32>> {
        (0..n)
            .flat_map(|y| (0..n).map(move |x| Point2::new(x as f32 * step, y as f32 * step)))
            .collect()
    }

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "({},{}) !~ ({},{})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    #[test]
    fn dlt_recovers_projective_map() {
        let truth = Homography::new(Matrix3::new(
            0.9, 0.1, 40.0, //
            -0.05, 1.1, 25.0, //
            0.0005, -0.0003, 1.0,
        ));
        let src = grid(4, 30.0);
        let dst: Vec<_> = src.iter().map(|&p| truth.apply(p)).collect();
        let est = estimate_homography(&src, &dst).expect("estimate");
        for &p in &src {
            assert_close(est.apply(p), truth.apply(p), 1e-2);
        }
    }

    #[test]
    fn minimal_four_point_solve() {
        let truth = Homography::new(Matrix3::new(
            1.05, -0.08, 22.0, //
            0.04, 0.93, -10.0, //
            0.0003, 0.0006, 1.0,
        ));
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(120.0, 0.0),
            Point2::new(120.0, 90.0),
            Point2::new(0.0, 90.0),
        ];
        let dst: Vec<_> = src.iter().map(|&p| truth.apply(p)).collect();
        let est = estimate_homography(&src, &dst).expect("4-point solve");
        for p in [Point2::new(15.0_f32, 70.0), Point2::new(100.0, 30.0)] {
            assert_close(est.apply(p), truth.apply(p), 1e-2);
        }
    }

    #[test]
    fn too_few_points_fail() {
        let pts = grid(2, 10.0);
        assert!(estimate_homography(&pts[..3], &pts[..3]).is_none());
        assert!(ransac_homography(&pts[..3], &pts[..3], &RansacParams::default()).is_none());
    }

    #[test]
    fn ransac_survives_outliers() {
        let src = grid(5, 25.0);
        let mut dst: Vec<_> = src
            .iter()
            .map(|&p| Point2::new(p.x + 60.0, p.y + 35.0))
            .collect();
        // Corrupt 7 of 25 correspondences.
        for (i, p) in dst.iter_mut().enumerate().take(7) {
            p.x += 300.0 + 13.0 * i as f32;
            p.y -= 150.0;
        }

        let (h, inliers) =
            ransac_homography(&src, &dst, &RansacParams::default()).expect("robust fit");
        assert_eq!(inliers.iter().filter(|&&f| f).count(), 18);
        assert_close(h.apply(Point2::new(10.0, 10.0)), Point2::new(70.0, 45.0), 0.5);
    }

    #[test]
    fn projected_corners_of_translation() {
        let src = grid(4, 20.0);
        let dst: Vec<_> = src
            .iter()
            .map(|&p| Point2::new(p.x + 15.0, p.y + 8.0))
            .collect();
        let (h, _) = ransac_homography(&src, &dst, &RansacParams::default()).expect("fit");
        let corners = project_reference_corners(&h, 50, 40);
        assert_close(corners[0], Point2::new(15.0, 8.0), 0.5);
        assert_close(corners[2], Point2::new(65.0, 48.0), 0.5);
    }

    #[test]
    fn inverse_round_trips() {
        let h = Homography::new(Matrix3::new(
            1.1, 0.05, 12.0, //
            -0.02, 0.95, -4.0, //
            0.0004, 0.0002, 1.0,
        ));
        let inv = h.inverse().expect("invertible");
        let p = Point2::new(33.0, 21.0);
        assert_close(inv.apply(h.apply(p)), p, 1e-3);
    }
}
