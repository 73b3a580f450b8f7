//! The blocking read-detect-emit loop.
//!
//! Single-threaded by design: each frame is processed to completion before
//! the next is read. Cancellation is cooperative and polled once per frame,
//! so an in-flight frame always finishes.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

use crate::orchestrator::{DetectorMode, Orchestrator, OrchestratorError};
use crate::sink::{FrameMeta, ResultSink};
use crate::source::FrameSource;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// End-of-session summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: usize,
    pub detections: usize,
}

/// Drive a source to exhaustion (or cancellation) through the orchestrator.
///
/// Error policy: a per-frame failure aborts a still-image invocation but is
/// logged and skipped on a stream.
pub fn run_session(
    source: &mut dyn FrameSource,
    orchestrator: &Orchestrator,
    mode: DetectorMode,
    sink: &mut dyn ResultSink,
    cancel: &AtomicBool,
) -> Result<SessionStats, SessionError> {
    let mut stats = SessionStats::default();
    let is_stream = source.is_stream();

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!("cancellation requested, stopping after {} frame(s)", stats.frames);
            break;
        }
        let Some(frame) = source.next_frame() else {
            break;
        };
        stats.frames += 1;

        let result = match orchestrator.detect(&frame, mode) {
            Ok(r) => r,
            Err(e) if is_stream => {
                error!("frame {} failed: {e}", stats.frames);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if result.has_detection() {
            stats.detections += 1;
        }
        let meta = FrameMeta {
            frame_index: stats.frames,
            is_stream,
            count: result.count(),
            has_detection: result.has_detection(),
        };
        sink.on_result(result.frame(), result.mask(), &meta);
    }

    if is_stream {
        info!(
            "stream done: {} frame(s), {} with a detection",
            stats.frames, stats.detections
        );
    }
    Ok(stats)
}
