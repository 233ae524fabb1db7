//! Synthetic NV12 frames standing in for a decoder.

use prism_core::{ColorRange, Frame, FrameSource, MediaTime, PixelFormat, SharedFrame, SurfaceId, YuvMatrix};
use std::sync::Arc;

pub struct SyntheticSource {
    width: u32,
    height: u32,
    fps_num: i64,
    fps_den: i64,
    limit: u64,
    /// Every this many frames a run of the same length is surface-backed.
    surface_run: Option<u64>,
    emitted: u64,
    shown: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps_num: i64, fps_den: i64, limit: u64) -> Self {
        Self {
            width,
            height,
            fps_num,
            fps_den,
            limit,
            surface_run: None,
            emitted: 0,
            shown: 0,
        }
    }

    /// Alternate between CPU frames and surface-backed frames every `run` frames.
    pub fn with_surface_runs(mut self, run: u64) -> Self {
        self.surface_run = Some(run.max(1));
        self
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }

    pub fn is_exhausted(&self) -> bool {
        self.emitted >= self.limit
    }

    fn render(&self, index: u64) -> Frame {
        let pts = MediaTime::from_frame_index(index as i64, self.fps_num, self.fps_den);
        let fps = self.fps_num as f32 / self.fps_den as f32;
        let mut frame = Frame::new(self.width, self.height, PixelFormat::Nv12)
            .with_colorimetry(YuvMatrix::Bt709, ColorRange::Limited)
            .with_timing(pts, fps);

        // Luma ramp scrolling one column per frame.
        let width = self.width as u64;
        let luma = &mut frame.planes[0];
        for y in 0..luma.height {
            for (x, sample) in luma.row_mut(y, 1).iter_mut().enumerate() {
                let phase = (x as u64 + index) % width.max(1);
                *sample = 16 + (phase * 219 / width.max(1)) as u8;
            }
        }
        frame.planes[1].fill(&[128, 128]);

        if let Some(run) = self.surface_run {
            if (index / run) % 2 == 1 {
                frame = frame.with_surface(SurfaceId(index));
            }
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self, _force: bool) -> Option<SharedFrame> {
        if self.is_exhausted() {
            return None;
        }
        let frame = self.render(self.emitted);
        self.emitted += 1;
        Some(Arc::new(frame))
    }

    fn on_frame_shown(&mut self, _pts: MediaTime) {
        self.shown += 1;
    }
}
