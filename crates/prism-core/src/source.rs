//! The decoder-side collaborator the presenter pulls frames from.

use crate::frame::SharedFrame;
use crate::time::MediaTime;

/// Supplies displayable frames and owns the playback clock.
///
/// `next_frame(true)` must return a frame whenever one is available, even if
/// pacing would not otherwise advance. `next_frame(false)` may hand back the
/// previous frame again (paused upstream, waiting for a keyframe).
pub trait FrameSource {
    fn next_frame(&mut self, force: bool) -> Option<SharedFrame>;

    /// A frame with this timestamp reached the screen.
    fn on_frame_shown(&mut self, pts: MediaTime);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self, force: bool) -> Option<SharedFrame> {
        (**self).next_frame(force)
    }

    fn on_frame_shown(&mut self, pts: MediaTime) {
        (**self).on_frame_shown(pts)
    }
}
