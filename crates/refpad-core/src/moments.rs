//! Image moments and the seven Hu invariants.
//!
//! Moments are taken over non-zero pixels of a mask, which keeps the
//! computation identical for a reference silhouette and a candidate region
//! rasterized the same way.

use crate::image::GrayImage;

/// Raw and central moments up to third order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,
}

pub fn moments_of_mask(mask: &GrayImage) -> Moments {
    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;
    for y in 0..mask.height {
        for x in 0..mask.width {
            if mask.at(x, y) == 0 {
                continue;
            }
            m00 += 1.0;
            m10 += x as f64;
            m01 += y as f64;
        }
    }
    if m00 == 0.0 {
        return Moments::default();
    }
    let cx = m10 / m00;
    let cy = m01 / m00;

    let mut mu = [0.0f64; 8]; // 20, 11, 02, 30, 21, 12, 03
    for y in 0..mask.height {
        for x in 0..mask.width {
            if mask.at(x, y) == 0 {
                continue;
            }
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            mu[0] += dx * dx;
            mu[1] += dx * dy;
            mu[2] += dy * dy;
            mu[3] += dx * dx * dx;
            mu[4] += dx * dx * dy;
            mu[5] += dx * dy * dy;
            mu[6] += dy * dy * dy;
        }
    }

    Moments {
        m00,
        m10,
        m01,
        mu20: mu[0],
        mu11: mu[1],
        mu02: mu[2],
        mu30: mu[3],
        mu21: mu[4],
        mu12: mu[5],
        mu03: mu[6],
    }
}

/// The seven rotation/scale/translation-invariant Hu moments.
pub fn hu_invariants(m: &Moments) -> [f64; 7] {
    if m.m00 <= 0.0 {
        return [0.0; 7];
    }
    // Scale-normalized central moments.
    let n = |mu: f64, order: f64| mu / m.m00.powf(1.0 + order / 2.0);
    let n20 = n(m.mu20, 2.0);
    let n11 = n(m.mu11, 2.0);
    let n02 = n(m.mu02, 2.0);
    let n30 = n(m.mu30, 3.0);
    let n21 = n(m.mu21, 3.0);
    let n12 = n(m.mu12, 3.0);
    let n03 = n(m.mu03, 3.0);

    let h1 = n20 + n02;
    let h2 = (n20 - n02).powi(2) + 4.0 * n11.powi(2);
    let h3 = (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2);
    let h4 = (n30 + n12).powi(2) + (n21 + n03).powi(2);
    let h5 = (n30 - 3.0 * n12)
        * (n30 + n12)
        * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        + (3.0 * n21 - n03) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));
    let h6 = (n20 - n02) * ((n30 + n12).powi(2) - (n21 + n03).powi(2))
        + 4.0 * n11 * (n30 + n12) * (n21 + n03);
    let h7 = (3.0 * n21 - n03)
        * (n30 + n12)
        * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        - (n30 - 3.0 * n12) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));

    [h1, h2, h3, h4, h5, h6, h7]
}

/// L2 distance between two Hu vectors in log-magnitude space.
pub fn hu_log_distance(a: &[f64; 7], b: &[f64; 7]) -> f64 {
    let mut acc = 0.0;
    for i in 0..7 {
        let la = (a[i].abs() + 1e-12).log10();
        let lb = (b[i].abs() + 1e-12).log10();
        acc += (la - lb) * (la - lb);
    }
    acc.sqrt()
}
