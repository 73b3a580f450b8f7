//! Result sink contract.
//!
//! One method, called once per processed frame. The orchestration never
//! depends on what a sink actually does with the result; display windows,
//! encoders and network shippers all sit behind this trait.

use refpad_core::{Frame, GrayImage};

/// Per-frame metadata delivered alongside the annotated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameMeta {
    /// 1-based index within the session.
    pub frame_index: usize,
    pub is_stream: bool,
    /// Match count (keypoint path) or detection count (color path).
    pub count: usize,
    pub has_detection: bool,
}

pub trait ResultSink {
    fn on_result(&mut self, frame: &Frame, mask: Option<&GrayImage>, meta: &FrameMeta);
}

/// Fan-out to several sinks in registration order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn ResultSink>) {
        self.sinks.push(sink);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for SinkSet {
    fn on_result(&mut self, frame: &Frame, mask: Option<&GrayImage>, meta: &FrameMeta) {
        for sink in &mut self.sinks {
            sink.on_result(frame, mask, meta);
        }
    }
}

#[cfg(feature = "image")]
pub use save::{SaveImageSink, SaveMaskSink};

#[cfg(feature = "image")]
mod save {
    use std::path::PathBuf;

    use log::{error, info};

    use refpad_core::{Frame, GrayImage};

    use super::{FrameMeta, ResultSink};
    use crate::detect::{gray_to_image, image_from_frame};

    /// Writes the annotated frame. For a stream the file ends up holding the
    /// last processed frame.
    pub struct SaveImageSink {
        path: PathBuf,
    }

    impl SaveImageSink {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl ResultSink for SaveImageSink {
        fn on_result(&mut self, frame: &Frame, _mask: Option<&GrayImage>, _meta: &FrameMeta) {
            match image_from_frame(frame).save(&self.path) {
                Ok(()) => info!("saved result to {}", self.path.display()),
                Err(e) => error!("failed to save {}: {e}", self.path.display()),
            }
        }
    }

    /// Writes the binary occupancy mask when one is present.
    pub struct SaveMaskSink {
        path: PathBuf,
    }

    impl SaveMaskSink {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl ResultSink for SaveMaskSink {
        fn on_result(&mut self, _frame: &Frame, mask: Option<&GrayImage>, _meta: &FrameMeta) {
            let Some(mask) = mask else {
                return;
            };
            match gray_to_image(mask).save(&self.path) {
                Ok(()) => info!("saved mask to {}", self.path.display()),
                Err(e) => error!("failed to save {}: {e}", self.path.display()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting(usize);

    impl ResultSink for Counting {
        fn on_result(&mut self, _: &Frame, _: Option<&GrayImage>, _: &FrameMeta) {
            self.0 += 1;
        }
    }

    #[test]
    fn sink_set_fans_out() {
        let mut set = SinkSet::new();
        set.push(Box::new(Counting(0)));
        set.push(Box::new(Counting(0)));
        assert_eq!(set.len(), 2);
        let meta = FrameMeta {
            frame_index: 1,
            is_stream: false,
            count: 0,
            has_detection: false,
        };
        set.on_result(&Frame::new(2, 2), None, &meta);
        // No panic and both sinks were visited; counts are internal, the
        // observable contract is just the single call per sink.
    }
}
