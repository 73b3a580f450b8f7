//! Brute-force Hamming matching with Lowe's ratio test.
//!
//! Brute force is fast enough at the descriptor counts this workspace uses
//! (reference banks of a few thousand descriptors) and keeps memory flat.

use crate::extractor::Descriptor;

/// Accepted correspondence: `query` indexes the reference descriptor set,
/// `train` the frame/candidate set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// k-NN (k = 2) matching: a query descriptor is accepted when its best
/// distance is below `ratio` times the second best. Needs at least two train
/// descriptors, otherwise no pair exists and nothing is accepted.
pub fn knn_ratio_matches(query: &[Descriptor], train: &[Descriptor], ratio: f32) -> Vec<Match> {
    if train.len() < 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (qi, q) in query.iter().enumerate() {
        let mut best = u32::MAX;
        let mut second = u32::MAX;
        let mut best_ti = 0usize;
        for (ti, t) in train.iter().enumerate() {
            let d = q.distance(t);
            if d < best {
                second = best;
                best = d;
                best_ti = ti;
            } else if d < second {
                second = d;
            }
        }
        if (best as f32) < ratio * second as f32 {
            out.push(Match {
                query: qi,
                train: best_ti,
                distance: best,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::DESCRIPTOR_BYTES;

    fn desc(bits: &[usize]) -> Descriptor {
        let mut d = [0u8; DESCRIPTOR_BYTES];
        for &b in bits {
            d[b / 8] |= 1 << (b % 8);
        }
        Descriptor(d)
    }

    #[test]
    fn unambiguous_match_is_accepted() {
        let q = [desc(&[0, 1, 2])];
        let train = [desc(&[0, 1, 2, 3]), desc(&(100..160).collect::<Vec<_>>())];
        let m = knn_ratio_matches(&q, &train, 0.75);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].train, 0);
        assert_eq!(m[0].distance, 1);
    }

    #[test]
    fn ambiguous_match_is_rejected() {
        // Two train descriptors at nearly the same distance.
        let q = [desc(&[0, 1, 2, 3])];
        let train = [desc(&[0, 1, 2]), desc(&[1, 2, 3])];
        assert!(knn_ratio_matches(&q, &train, 0.75).is_empty());
    }

    #[test]
    fn single_train_descriptor_yields_nothing() {
        let q = [desc(&[0])];
        let train = [desc(&[0])];
        assert!(knn_ratio_matches(&q, &train, 0.75).is_empty());
    }

    #[test]
    fn exact_match_beats_noise() {
        let target = desc(&(0..40).step_by(3).collect::<Vec<_>>());
        let q = [target];
        let train = [desc(&(200..240).collect::<Vec<_>>()), target];
        let m = knn_ratio_matches(&q, &train, 0.75);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].train, 1);
        assert_eq!(m[0].distance, 0);
    }
}
