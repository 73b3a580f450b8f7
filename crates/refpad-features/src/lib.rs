//! Keypoint backend: FAST-9 corners, steered BRIEF descriptors, brute-force
//! Hamming matching, and the contrast/edge preprocessing stage.
//!
//! The backend is an owned handle (`FeatureExtractor`) constructed explicitly
//! with its parameters; there is no lazily initialized global state.

mod brief;
mod extractor;
mod fast;
mod matcher;
mod preprocess;

pub use extractor::{Descriptor, FeatureExtractor, FeatureParams, Keypoint};
pub use matcher::{knn_ratio_matches, Match};
pub use preprocess::{edge_map, equalize_luminance, preprocess_for_keypoints};
