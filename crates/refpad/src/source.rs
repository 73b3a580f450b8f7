//! Frame source contract.
//!
//! A source produces 8-bit RGB frames until it runs out: exactly one for a
//! still image, finitely or indefinitely many for a stream. Camera and video
//! capture live outside this workspace; anything that can hand out [`Frame`]s
//! plugs in through this trait.

use std::collections::VecDeque;

use refpad_core::Frame;

/// Errors opening a source. Fatal for the invocation, never retried.
#[derive(thiserror::Error, Debug)]
pub enum SourceOpenError {
    #[error("source not found: {path}")]
    NotFound { path: String },
    #[error("unsupported source '{path}': {reason}")]
    Unsupported { path: String, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
}

pub trait FrameSource {
    /// Next frame, or `None` at end of sequence. End of sequence may occur
    /// at any point, including immediately.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Whether this source is a stream (video/camera) rather than a still.
    fn is_stream(&self) -> bool;
}

/// In-memory frame sequence; the stream flag is caller-chosen so tests can
/// exercise both policies.
#[derive(Clone, Debug, Default)]
pub struct FrameSeq {
    frames: VecDeque<Frame>,
    stream: bool,
}

impl FrameSeq {
    pub fn new(frames: impl IntoIterator<Item = Frame>, stream: bool) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            stream,
        }
    }

    pub fn still(frame: Frame) -> Self {
        Self::new([frame], false)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameSeq {
    fn next_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    fn is_stream(&self) -> bool {
        self.stream
    }
}
